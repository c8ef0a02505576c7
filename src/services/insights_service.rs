use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::agent::{AgentInsights, ChatMessage, InsightsStateDto};
use crate::services::agent_service::{AgentReply, AgentTransport};
use crate::services::dataset_service::DatasetService;
use crate::services::prompt_templates::{
    build_chat_prompt, build_data_context, build_insights_prompt, SUGGESTED_QUESTIONS,
};

const INSIGHTS_FALLBACK_TEXT: &str = "Analysis complete. Here are the insights.";
const CHAT_FALLBACK_TEXT: &str = "I could not generate a response.";

/// Orchestrates insight generation and the analyst chat on top of the
/// agent transport.
///
/// The two operations hold independent in-flight slots: a second request
/// on a busy slot is rejected with a conflict instead of queueing. Every
/// request also carries a sequence number, and a response that lost the
/// race to a newer one is discarded instead of applied.
pub struct InsightsService {
    transport: Arc<dyn AgentTransport>,
    dataset: Arc<DatasetService>,
    insights: RwLock<InsightsSnapshot>,
    chat: RwLock<Vec<ChatMessage>>,
    insights_in_flight: AtomicBool,
    chat_in_flight: AtomicBool,
    sequence: AtomicU64,
    insights_applied: AtomicU64,
    chat_applied: AtomicU64,
}

#[derive(Default)]
struct InsightsSnapshot {
    insights: Option<AgentInsights>,
    error: Option<String>,
}

impl InsightsService {
    pub fn new(transport: Arc<dyn AgentTransport>, dataset: Arc<DatasetService>) -> Self {
        Self {
            transport,
            dataset,
            insights: RwLock::new(InsightsSnapshot::default()),
            chat: RwLock::new(Vec::new()),
            insights_in_flight: AtomicBool::new(false),
            chat_in_flight: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            insights_applied: AtomicU64::new(0),
            chat_applied: AtomicU64::new(0),
        }
    }

    /// Runs a full-dataset analysis. On success the insights state is
    /// replaced and the chat restarts from a single assistant turn that
    /// carries the new insights. On failure only the error channel is
    /// set; previously shown insights stay visible.
    pub async fn generate(&self) -> AppResult<InsightsStateDto> {
        let records = self.dataset.records()?;
        if records.is_empty() {
            return Err(AppError::validation("no data loaded to analyze"));
        }

        let _slot = Slot::acquire(&self.insights_in_flight, "insights generation")?;
        let seq = self.next_sequence();
        let prompt = build_insights_prompt(&build_data_context(&records));

        match self.transport.analyze(&prompt).await {
            Ok(reply) => {
                if self.is_stale(&self.insights_applied, seq) {
                    debug!(target: "app::insights", seq, "discarding stale insights reply");
                    return Ok(self.state());
                }
                let parsed = finalize_insights(&reply);
                let content = chat_seed_content(&parsed);
                {
                    let mut guard = self.insights.write().expect("insights lock poisoned");
                    guard.insights = Some(parsed.clone());
                    guard.error = None;
                }
                {
                    let mut chat = self.chat.write().expect("chat lock poisoned");
                    *chat = vec![ChatMessage::assistant(content, Some(parsed))];
                }
                debug!(target: "app::insights", seq, "insights applied");
            }
            Err(err) => {
                if self.is_stale(&self.insights_applied, seq) {
                    debug!(target: "app::insights", seq, "discarding stale insights failure");
                    return Ok(self.state());
                }
                warn!(target: "app::insights", seq, error = %err, "insight generation failed");
                let mut guard = self.insights.write().expect("insights lock poisoned");
                guard.error = Some(err.to_string());
            }
        }

        Ok(self.state())
    }

    pub fn state(&self) -> InsightsStateDto {
        let guard = self.insights.read().expect("insights lock poisoned");
        InsightsStateDto {
            insights: guard.insights.clone(),
            error: guard.error.clone(),
            generating: self.insights_in_flight.load(Ordering::SeqCst),
        }
    }

    /// Sends one chat turn. The user message is recorded before the
    /// agent call; a failed call still produces an assistant turn with
    /// the error text, so the conversation stays coherent.
    pub async fn chat_send(&self, message: &str) -> AppResult<Vec<ChatMessage>> {
        let question = message.trim();
        if question.is_empty() {
            return Err(AppError::validation("chat message must not be empty"));
        }

        let _slot = Slot::acquire(&self.chat_in_flight, "chat send")?;
        let seq = self.next_sequence();

        {
            let mut chat = self.chat.write().expect("chat lock poisoned");
            chat.push(ChatMessage::user(question));
        }

        let records = self.dataset.records()?;
        let prompt = build_chat_prompt(&build_data_context(&records), question);

        let turn = match self.transport.analyze(&prompt).await {
            Ok(reply) => {
                let content = reply.summary_or(CHAT_FALLBACK_TEXT);
                ChatMessage::assistant(content, reply.insights.clone())
            }
            Err(err) => {
                warn!(target: "app::insights", seq, error = %err, "chat turn failed");
                ChatMessage::assistant(err.to_string(), None)
            }
        };

        if self.is_stale(&self.chat_applied, seq) {
            debug!(target: "app::insights", seq, "discarding stale chat reply");
            return self.history();
        }

        let mut chat = self.chat.write().expect("chat lock poisoned");
        chat.push(turn);
        Ok(chat.clone())
    }

    pub fn history(&self) -> AppResult<Vec<ChatMessage>> {
        let chat = self.chat.read().expect("chat lock poisoned");
        Ok(chat.clone())
    }

    pub fn suggestions(&self) -> Vec<String> {
        SUGGESTED_QUESTIONS.iter().map(|q| q.to_string()).collect()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Marks `seq` as applied unless a newer response already was.
    fn is_stale(&self, applied: &AtomicU64, seq: u64) -> bool {
        applied.fetch_max(seq, Ordering::SeqCst) > seq
    }
}

/// RAII in-flight marker; released on drop so errors cannot wedge a slot.
struct Slot<'a> {
    flag: &'a AtomicBool,
}

impl<'a> Slot<'a> {
    fn acquire(flag: &'a AtomicBool, what: &str) -> AppResult<Self> {
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::conflict(format!("{what} is already in progress")));
        }
        Ok(Self { flag })
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Normalizes a reply into display-ready insights: the summary falls back
/// to the free-text message when the structured one is absent.
fn finalize_insights(reply: &AgentReply) -> AgentInsights {
    let mut parsed = reply.insights.clone().unwrap_or_default();
    if parsed.summary.as_deref().map_or(true, str::is_empty) {
        parsed.summary = reply.message.clone();
    }
    parsed
}

fn chat_seed_content(insights: &AgentInsights) -> String {
    match insights.summary.as_deref() {
        Some(summary) if !summary.is_empty() => summary.to_string(),
        _ => INSIGHTS_FALLBACK_TEXT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_rejects_second_acquire_and_releases_on_drop() {
        let flag = AtomicBool::new(false);
        let first = Slot::acquire(&flag, "op").unwrap();
        assert!(matches!(
            Slot::acquire(&flag, "op"),
            Err(AppError::Conflict { .. })
        ));
        drop(first);
        assert!(Slot::acquire(&flag, "op").is_ok());
    }

    #[test]
    fn finalize_prefers_structured_summary() {
        let reply = AgentReply {
            insights: Some(AgentInsights {
                summary: Some("structured".to_string()),
                ..AgentInsights::default()
            }),
            message: Some("free text".to_string()),
            latency_ms: 1,
            correlation_id: "c".to_string(),
        };
        assert_eq!(finalize_insights(&reply).summary.as_deref(), Some("structured"));
    }

    #[test]
    fn finalize_falls_back_to_message() {
        let reply = AgentReply {
            insights: None,
            message: Some("free text".to_string()),
            latency_ms: 1,
            correlation_id: "c".to_string(),
        };
        let parsed = finalize_insights(&reply);
        assert_eq!(parsed.summary.as_deref(), Some("free text"));
        assert!(parsed.top_performers.is_empty());
    }

    #[test]
    fn chat_seed_uses_fixed_text_when_summary_is_blank() {
        let insights = AgentInsights::default();
        assert_eq!(chat_seed_content(&insights), INSIGHTS_FALLBACK_TEXT);
    }
}

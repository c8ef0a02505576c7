use serde::{Deserialize, Serialize};

/// Structured analysis payload returned by the agent. Every field is
/// optional; the gateway never rejects a reply for missing sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentInsights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub top_performers: Vec<AgentTopPerformer>,
    #[serde(default)]
    pub bottom_performers: Vec<AgentBottomPerformer>,
    #[serde(default)]
    pub attendance_flags: Vec<AgentAttendanceFlag>,
    #[serde(default)]
    pub trends: Vec<AgentTrend>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentTopPerformer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentBottomPerformer {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentAttendanceFlag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentTrend {
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One turn of the analyst chat. Assistant turns may carry structured
/// data alongside (or instead of) prose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AgentInsights>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            data: None,
        }
    }

    pub fn assistant(content: impl Into<String>, data: Option<AgentInsights>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            data,
        }
    }
}

/// Snapshot of the insights panel: at most one of `insights` and `error`
/// is set, and a failed refresh never clears previously shown insights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsStateDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<AgentInsights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generating: bool,
}

/// Connectivity and configuration summary for the agent gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatusDto {
    pub configured: bool,
    pub reachable: bool,
    pub base_url: String,
    pub agent_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProviderMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

use std::sync::{Arc, RwLock};
use std::time::{Duration as StdDuration, Instant};

use reqwest::StatusCode;
use serde_json::{json, Value as JsonValue};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AgentErrorCode, AppError, AppResult};
use crate::models::agent::{AgentInsights, AgentProviderMetadata};

const DEFAULT_BASE_URL: &str = "https://agents.kpilens.cloud";
const DEFAULT_AGENT_ID: &str = "kpi-analyst";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parsed reply from one analyze call. `insights` is present only when
/// the agent returned a structured `result` object.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub insights: Option<AgentInsights>,
    pub message: Option<String>,
    pub latency_ms: u64,
    pub correlation_id: String,
}

impl AgentReply {
    /// Best-effort prose: structured summary first, then the free-text
    /// message, then the caller's fallback.
    pub fn summary_or(&self, fallback: &str) -> String {
        self.insights
            .as_ref()
            .and_then(|i| i.summary.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[async_trait::async_trait]
pub trait AgentTransport: Send + Sync {
    async fn analyze(&self, prompt: &str) -> AppResult<AgentReply>;
    async fn ping(&self) -> AppResult<AgentProviderMetadata>;
}

/// Entry point for everything that talks to the remote analysis agent.
/// Configuration comes from the environment and is re-read before each
/// call, so a key exported mid-session takes effect without a restart.
pub struct AgentService {
    provider: Arc<RwLock<Option<Arc<HttpAgentProvider>>>>,
    config: Arc<RwLock<AgentServiceConfig>>,
}

#[derive(Debug, Clone)]
struct AgentServiceConfig {
    api_key: Option<String>,
    base_url: String,
    agent_id: String,
    http_timeout: StdDuration,
}

impl AgentService {
    pub fn new() -> AppResult<Self> {
        let config = AgentServiceConfig::from_env();
        let provider = config.build_provider()?;
        Ok(Self {
            provider: Arc::new(RwLock::new(provider)),
            config: Arc::new(RwLock::new(config)),
        })
    }

    pub async fn analyze(&self, prompt: &str) -> AppResult<AgentReply> {
        self.refresh_configuration()?;
        let provider = self.current_provider()?;
        provider.analyze(prompt).await
    }

    pub async fn ping(&self) -> AppResult<AgentProviderMetadata> {
        self.refresh_configuration()?;
        let provider = self.current_provider()?;
        provider.ping().await
    }

    pub fn is_configured(&self) -> bool {
        self.provider
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn base_url(&self) -> String {
        self.config
            .read()
            .map(|guard| guard.base_url.clone())
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
    }

    pub fn agent_id(&self) -> String {
        self.config
            .read()
            .map(|guard| guard.agent_id.clone())
            .unwrap_or_else(|_| DEFAULT_AGENT_ID.to_string())
    }

    pub fn refresh_configuration(&self) -> AppResult<()> {
        let config = AgentServiceConfig::from_env();

        let mut provider_update: Option<Option<Arc<HttpAgentProvider>>> = None;
        {
            let mut current = self.config.write().expect("config lock poisoned");
            if current.differs_from(&config) {
                provider_update = Some(config.build_provider()?);
            }
            *current = config;
        }

        if let Some(update) = provider_update {
            let mut guard = self.provider.write().expect("provider lock poisoned");
            *guard = update;
        }

        Ok(())
    }

    fn current_provider(&self) -> AppResult<Arc<HttpAgentProvider>> {
        let guard = self.provider.read().expect("provider lock poisoned");
        guard.as_ref().cloned().ok_or_else(|| {
            AppError::agent(
                AgentErrorCode::MissingApiKey,
                "agent API key is not configured",
            )
        })
    }
}

impl AgentServiceConfig {
    fn from_env() -> Self {
        let api_key = std::env::var("KPILENS_AGENT_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let base_url = std::env::var("KPILENS_AGENT_BASE_URL")
            .ok()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let agent_id = std::env::var("KPILENS_AGENT_ID")
            .ok()
            .unwrap_or_else(|| DEFAULT_AGENT_ID.to_string());
        let timeout_secs = std::env::var("KPILENS_AGENT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key,
            base_url,
            agent_id,
            http_timeout: StdDuration::from_secs(timeout_secs),
        }
    }

    fn differs_from(&self, other: &Self) -> bool {
        self.api_key != other.api_key
            || self.base_url != other.base_url
            || self.agent_id != other.agent_id
            || self.http_timeout != other.http_timeout
    }

    fn build_provider(&self) -> AppResult<Option<Arc<HttpAgentProvider>>> {
        match &self.api_key {
            Some(api_key) => {
                let provider = HttpAgentProvider::try_new(self, api_key.clone())?;
                Ok(Some(Arc::new(provider)))
            }
            None => Ok(None),
        }
    }
}

struct HttpAgentProvider {
    client: reqwest::Client,
    api_key: String,
    agent_url: String,
    analyze_endpoint: String,
    agent_id: String,
}

impl HttpAgentProvider {
    fn try_new(config: &AgentServiceConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("failed to build agent HTTP client: {err}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let agent_url = format!("{}/v1/agents/{}", base_url, config.agent_id);
        let analyze_endpoint = format!("{agent_url}/analyze");

        Ok(Self {
            client,
            api_key,
            agent_url,
            analyze_endpoint,
            agent_id: config.agent_id.clone(),
        })
    }

    async fn invoke_analyze(&self, prompt: &str) -> AppResult<AgentReply> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_body = json!({ "message": prompt });
        let backoff_schedule = [
            StdDuration::from_secs(0),
            StdDuration::from_secs(1),
            StdDuration::from_secs(2),
            StdDuration::from_secs(4),
        ];

        let mut last_error: Option<AppError> = None;

        for (attempt, delay) in backoff_schedule.iter().enumerate() {
            if *delay > StdDuration::from_secs(0) {
                sleep(*delay).await;
            }

            debug!(
                target: "app::agent",
                attempt = attempt + 1,
                correlation_id = %correlation_id,
                prompt_len = prompt.len(),
                "invoking analysis agent"
            );

            let start = Instant::now();
            let response = self
                .client
                .post(&self.analyze_endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let latency_ms = start.elapsed().as_millis() as u64;
                        let body: JsonValue = resp.json().await.map_err(|err| {
                            AppError::agent_with_details(
                                AgentErrorCode::InvalidResponse,
                                "failed to read agent response body",
                                Some(correlation_id.as_str()),
                                Some(json!({ "reason": err.to_string() })),
                            )
                        })?;

                        let reply =
                            Self::parse_reply(&body, latency_ms, correlation_id.clone())?;
                        debug!(
                            target: "app::agent",
                            correlation_id = %correlation_id,
                            latency_ms,
                            structured = reply.insights.is_some(),
                            "agent responded"
                        );
                        return Ok(reply);
                    }

                    let (error, retryable) = Self::map_http_error(status, correlation_id.as_str());
                    warn!(
                        target: "app::agent",
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        retryable,
                        "agent returned non-success status"
                    );

                    if !retryable || attempt == backoff_schedule.len() - 1 {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(err) => {
                    let (error, retryable) = Self::error_from_reqwest(err, correlation_id.as_str());
                    warn!(
                        target: "app::agent",
                        correlation_id = %correlation_id,
                        retryable,
                        "agent request error"
                    );

                    if !retryable || attempt == backoff_schedule.len() - 1 {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
            }
        }

        if let Some(error) = last_error {
            Err(error)
        } else {
            Err(AppError::agent_with_details(
                AgentErrorCode::AgentUnavailable,
                "agent request failed",
                Some(correlation_id.as_str()),
                None,
            ))
        }
    }

    /// Replies carry an optional structured `result` object and an
    /// optional free-text `message`. Both absent is still a valid reply;
    /// a `result` that does not fit the insights shape is dropped in
    /// favor of the message rather than failing the whole call.
    fn parse_reply(
        body: &JsonValue,
        latency_ms: u64,
        correlation_id: String,
    ) -> AppResult<AgentReply> {
        let insights = match body.get("result") {
            Some(JsonValue::Null) | None => None,
            Some(value) => match serde_json::from_value::<AgentInsights>(value.clone()) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!(
                        target: "app::agent",
                        correlation_id = %correlation_id,
                        error = %err,
                        "agent result object does not match the insights shape"
                    );
                    None
                }
            },
        };
        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        Ok(AgentReply {
            insights,
            message,
            latency_ms,
            correlation_id,
        })
    }

    async fn invoke_ping(&self) -> AppResult<AgentProviderMetadata> {
        let correlation_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let response = self
            .client
            .get(&self.agent_url)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                let latency_ms = start.elapsed().as_millis() as u64;
                if !status.is_success() {
                    let (error, _) = Self::map_http_error(status, correlation_id.as_str());
                    warn!(
                        target: "app::agent",
                        correlation_id = %correlation_id,
                        status = status.as_u16(),
                        "agent ping returned non-success status"
                    );
                    return Err(error);
                }
                Ok(AgentProviderMetadata {
                    agent_id: Some(self.agent_id.clone()),
                    latency_ms: Some(latency_ms),
                })
            }
            Err(err) => {
                let (error, _) = Self::error_from_reqwest(err, correlation_id.as_str());
                warn!(
                    target: "app::agent",
                    correlation_id = %correlation_id,
                    "agent ping failed"
                );
                Err(error)
            }
        }
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> (AppError, bool) {
        match status {
            StatusCode::UNAUTHORIZED => (
                AppError::agent_with_details(
                    AgentErrorCode::MissingApiKey,
                    "agent API key is invalid or unauthorized",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::FORBIDDEN => (
                AppError::agent_with_details(
                    AgentErrorCode::Forbidden,
                    "agent API access denied",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::TOO_MANY_REQUESTS => (
                AppError::agent_with_details(
                    AgentErrorCode::RateLimited,
                    "agent is rate limiting requests, try again shortly",
                    Some(correlation_id),
                    None,
                ),
                true,
            ),
            status if status.is_server_error() => (
                AppError::agent_with_details(
                    AgentErrorCode::AgentUnavailable,
                    format!("agent is temporarily unavailable (status {})", status.as_u16()),
                    Some(correlation_id),
                    None,
                ),
                true,
            ),
            StatusCode::BAD_REQUEST => (
                AppError::agent_with_details(
                    AgentErrorCode::InvalidRequest,
                    "agent rejected the request payload",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            StatusCode::NOT_FOUND => (
                AppError::agent_with_details(
                    AgentErrorCode::InvalidRequest,
                    "agent endpoint not found, check the agent id",
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
            status => (
                AppError::agent_with_details(
                    AgentErrorCode::Unknown,
                    format!("agent returned unexpected status {}", status.as_u16()),
                    Some(correlation_id),
                    None,
                ),
                false,
            ),
        }
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> (AppError, bool) {
        if err.is_timeout() {
            (
                AppError::agent_with_details(
                    AgentErrorCode::HttpTimeout,
                    "agent request timed out",
                    Some(correlation_id),
                    None,
                ),
                true,
            )
        } else if err.is_connect() {
            (
                AppError::agent_with_details(
                    AgentErrorCode::AgentUnavailable,
                    "failed to connect to the agent",
                    Some(correlation_id),
                    None,
                ),
                true,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            (
                AppError::agent_with_details(
                    AgentErrorCode::Unknown,
                    format!("agent request failed: {err}"),
                    Some(correlation_id),
                    None,
                ),
                false,
            )
        }
    }
}

#[async_trait::async_trait]
impl AgentTransport for AgentService {
    async fn analyze(&self, prompt: &str) -> AppResult<AgentReply> {
        AgentService::analyze(self, prompt).await
    }

    async fn ping(&self) -> AppResult<AgentProviderMetadata> {
        AgentService::ping(self).await
    }
}

#[async_trait::async_trait]
impl AgentTransport for HttpAgentProvider {
    async fn analyze(&self, prompt: &str) -> AppResult<AgentReply> {
        self.invoke_analyze(prompt).await
    }

    async fn ping(&self) -> AppResult<AgentProviderMetadata> {
        self.invoke_ping().await
    }
}

pub mod testing {
    use super::*;

    /// Expose status mapping for integration tests without widening the
    /// public API surface.
    pub fn map_http_error(status: StatusCode) -> (AppError, bool) {
        HttpAgentProvider::map_http_error(status, "test-correlation-id")
    }

    pub async fn analyze_via_http(
        base_url: &str,
        timeout: StdDuration,
        prompt: &str,
    ) -> AppResult<AgentReply> {
        let provider = test_provider(base_url, timeout)?;
        provider.analyze(prompt).await
    }

    pub async fn ping_via_http(
        base_url: &str,
        timeout: StdDuration,
    ) -> AppResult<AgentProviderMetadata> {
        let provider = test_provider(base_url, timeout)?;
        provider.ping().await
    }

    fn test_provider(base_url: &str, timeout: StdDuration) -> AppResult<HttpAgentProvider> {
        let config = AgentServiceConfig {
            api_key: Some("test-key".to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            agent_id: "test-agent".to_string(),
            http_timeout: timeout,
        };
        HttpAgentProvider::try_new(&config, "test-key".to_string())
    }
}

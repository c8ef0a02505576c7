use std::fmt;

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorCode {
    MissingApiKey,
    Forbidden,
    HttpTimeout,
    RateLimited,
    InvalidResponse,
    InvalidRequest,
    AgentUnavailable,
    Unknown,
}

impl AgentErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentErrorCode::MissingApiKey => "MISSING_API_KEY",
            AgentErrorCode::Forbidden => "FORBIDDEN",
            AgentErrorCode::HttpTimeout => "HTTP_TIMEOUT",
            AgentErrorCode::RateLimited => "RATE_LIMITED",
            AgentErrorCode::InvalidResponse => "INVALID_RESPONSE",
            AgentErrorCode::InvalidRequest => "INVALID_REQUEST",
            AgentErrorCode::AgentUnavailable => "AGENT_UNAVAILABLE",
            AgentErrorCode::Unknown => "UNKNOWN_AGENT_ERROR",
        }
    }
}

impl fmt::Display for AgentErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        details: Option<JsonValue>,
    },

    #[error("{message}")]
    Agent {
        code: AgentErrorCode,
        message: String,
        correlation_id: Option<String>,
        details: Option<JsonValue>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            source: None,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            source: None,
            details: Some(details),
        }
    }

    pub fn agent(code: AgentErrorCode, message: impl Into<String>) -> Self {
        Self::agent_with_details(code, message, None, None)
    }

    pub fn agent_with_details(
        code: AgentErrorCode,
        message: impl Into<String>,
        correlation_id: Option<&str>,
        details: Option<JsonValue>,
    ) -> Self {
        let message = message.into();
        let correlation = correlation_id.map(|value| value.to_string());
        match (&correlation, &details) {
            (Some(id), Some(payload)) => {
                warn!(
                    target: "app::agent::error",
                    code = %code,
                    correlation_id = %id,
                    details = %payload,
                    %message
                );
            }
            (Some(id), None) => {
                warn!(
                    target: "app::agent::error",
                    code = %code,
                    correlation_id = %id,
                    %message
                );
            }
            (None, Some(payload)) => {
                warn!(target: "app::agent::error", code = %code, details = %payload, %message);
            }
            (None, None) => {
                warn!(target: "app::agent::error", code = %code, %message);
            }
        }

        AppError::Agent {
            code,
            message,
            correlation_id: correlation,
            details,
        }
    }

    pub fn agent_code(&self) -> Option<AgentErrorCode> {
        match self {
            AppError::Agent { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn agent_correlation_id(&self) -> Option<&str> {
        match self {
            AppError::Agent { correlation_id, .. } => correlation_id.as_deref(),
            _ => None,
        }
    }

    pub fn agent_details(&self) -> Option<&JsonValue> {
        match self {
            AppError::Agent { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::conflict", %message, "conflict error");
        AppError::Conflict { message }
    }

    pub fn not_found() -> Self {
        warn!(target: "app::dataset", "resource not found");
        AppError::NotFound
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }
}

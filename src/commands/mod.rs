pub mod agent_commands;
pub mod dashboard;
pub mod dataset;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tauri::async_runtime;
use tracing::error;

use crate::error::{AppError, AppResult};
use crate::services::agent_service::{AgentService, AgentTransport};
use crate::services::dashboard_service::DashboardService;
use crate::services::dataset_service::DatasetService;
use crate::services::insights_service::InsightsService;

#[derive(Clone)]
pub struct AppState {
    dataset_service: Arc<DatasetService>,
    dashboard_service: Arc<DashboardService>,
    agent_service: Arc<AgentService>,
    insights_service: Arc<InsightsService>,
}

impl AppState {
    pub fn new() -> AppResult<Self> {
        let dataset_service = Arc::new(DatasetService::new());
        let dashboard_service = Arc::new(DashboardService::new(Arc::clone(&dataset_service)));
        let agent_service = Arc::new(AgentService::new()?);
        let insights_service = Arc::new(InsightsService::new(
            Arc::clone(&agent_service) as Arc<dyn AgentTransport>,
            Arc::clone(&dataset_service),
        ));

        Ok(Self {
            dataset_service,
            dashboard_service,
            agent_service,
            insights_service,
        })
    }

    pub fn dataset(&self) -> Arc<DatasetService> {
        Arc::clone(&self.dataset_service)
    }

    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard_service)
    }

    pub fn agent(&self) -> Arc<AgentService> {
        Arc::clone(&self.agent_service)
    }

    pub fn insights(&self) -> Arc<InsightsService> {
        Arc::clone(&self.insights_service)
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "requested resource does not exist", None)
            }
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::Agent {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => {
                            for (key, value) in map {
                                merged.insert(key, value);
                            }
                        }
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                CommandError::new(code.as_str(), message, detail_value)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "failed to serialize payload", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "filesystem read/write failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

/// Offloads CPU-bound dashboard work to the blocking pool so command
/// handlers never stall the async runtime.
pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    async_runtime::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("background task failed: {err}"), None))?
        .map_err(CommandError::from)
}

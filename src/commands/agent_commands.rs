use tauri::State;
use tracing::{debug, warn};

use crate::models::agent::{AgentStatusDto, ChatMessage, InsightsStateDto};

use super::{AppState, CommandError, CommandResult};

pub(crate) async fn insights_generate_impl(
    app_state: &AppState,
) -> CommandResult<InsightsStateDto> {
    debug!(target: "app::command", "insights_generate invoked");

    match app_state.insights().generate().await {
        Ok(state) => {
            debug!(
                target: "app::command",
                has_insights = state.insights.is_some(),
                has_error = state.error.is_some(),
                "insights_generate completed"
            );
            Ok(state)
        }
        Err(error) => {
            let correlation_id = error.agent_correlation_id().unwrap_or("-");
            warn!(
                target: "app::command",
                error = %error,
                correlation_id = %correlation_id,
                "insights_generate failed"
            );
            Err(CommandError::from(error))
        }
    }
}

pub(crate) async fn chat_send_impl(
    app_state: &AppState,
    message: String,
) -> CommandResult<Vec<ChatMessage>> {
    if message.trim().is_empty() {
        return Err(CommandError::new(
            "VALIDATION_ERROR",
            "chat message must not be empty",
            None,
        ));
    }

    debug!(
        target: "app::command",
        message_len = message.len(),
        "chat_send invoked"
    );

    match app_state.insights().chat_send(&message).await {
        Ok(history) => {
            debug!(
                target: "app::command",
                turns = history.len(),
                "chat_send completed"
            );
            Ok(history)
        }
        Err(error) => {
            warn!(target: "app::command", error = %error, "chat_send failed");
            Err(CommandError::from(error))
        }
    }
}

pub(crate) async fn agent_status_impl(app_state: &AppState) -> CommandResult<AgentStatusDto> {
    let agent = app_state.agent();
    agent.refresh_configuration().map_err(CommandError::from)?;

    let base_url = agent.base_url();
    let agent_id = agent.agent_id();

    if !agent.is_configured() {
        return Ok(AgentStatusDto {
            configured: false,
            reachable: false,
            base_url,
            agent_id,
            latency_ms: None,
            detail: Some("agent API key is not configured".to_string()),
        });
    }

    match agent.ping().await {
        Ok(metadata) => Ok(AgentStatusDto {
            configured: true,
            reachable: true,
            base_url,
            agent_id,
            latency_ms: metadata.latency_ms,
            detail: None,
        }),
        Err(error) => {
            warn!(target: "app::command", error = %error, "agent ping failed");
            Ok(AgentStatusDto {
                configured: true,
                reachable: false,
                base_url,
                agent_id,
                latency_ms: None,
                detail: Some(error.to_string()),
            })
        }
    }
}

#[tauri::command]
pub async fn insights_generate(state: State<'_, AppState>) -> CommandResult<InsightsStateDto> {
    insights_generate_impl(state.inner()).await
}

#[tauri::command]
pub async fn insights_state_fetch(state: State<'_, AppState>) -> CommandResult<InsightsStateDto> {
    Ok(state.inner().insights().state())
}

#[tauri::command]
pub async fn chat_send(
    state: State<'_, AppState>,
    message: String,
) -> CommandResult<Vec<ChatMessage>> {
    chat_send_impl(state.inner(), message).await
}

#[tauri::command]
pub async fn chat_history_fetch(state: State<'_, AppState>) -> CommandResult<Vec<ChatMessage>> {
    state
        .inner()
        .insights()
        .history()
        .map_err(CommandError::from)
}

#[tauri::command]
pub async fn chat_suggestions(state: State<'_, AppState>) -> CommandResult<Vec<String>> {
    Ok(state.inner().insights().suggestions())
}

#[tauri::command]
pub async fn agent_status(state: State<'_, AppState>) -> CommandResult<AgentStatusDto> {
    agent_status_impl(state.inner()).await
}

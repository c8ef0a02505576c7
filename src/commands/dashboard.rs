use tauri::State;
use tracing::debug;

use crate::models::dashboard::{
    DashboardOverviewResponse, DashboardQueryParams, EmployeeDetail, LeaderboardEntry,
};

use super::{run_blocking, AppState, CommandResult};

#[tauri::command]
pub async fn dashboard_overview_fetch(
    state: State<'_, AppState>,
    params: Option<DashboardQueryParams>,
) -> CommandResult<DashboardOverviewResponse> {
    let app_state = state.inner().clone();
    let payload = params.unwrap_or_default();
    debug!(
        target: "app::command",
        period = %payload.period,
        sort_field = payload.sort_field.as_str(),
        "dashboard_overview_fetch invoked"
    );
    run_blocking(move || app_state.dashboard().overview(&payload)).await
}

#[tauri::command]
pub async fn dashboard_leaderboard_fetch(
    state: State<'_, AppState>,
    params: Option<DashboardQueryParams>,
) -> CommandResult<Vec<LeaderboardEntry>> {
    let app_state = state.inner().clone();
    let payload = params.unwrap_or_default();
    run_blocking(move || app_state.dashboard().leaderboard(&payload)).await
}

#[tauri::command]
pub async fn dashboard_employee_detail_fetch(
    state: State<'_, AppState>,
    name: String,
    params: Option<DashboardQueryParams>,
) -> CommandResult<EmployeeDetail> {
    let app_state = state.inner().clone();
    let payload = params.unwrap_or_default();
    debug!(
        target: "app::command",
        employee = %name,
        "dashboard_employee_detail_fetch invoked"
    );
    run_blocking(move || app_state.dashboard().employee_detail(&name, &payload)).await
}

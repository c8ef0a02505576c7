use serde::Serialize;
use tauri::State;
use tracing::debug;

use crate::models::record::KpiRecord;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub records_imported: usize,
    pub periods: Vec<String>,
    pub sample_mode: bool,
}

#[tauri::command]
pub async fn dataset_import_csv(
    state: State<'_, AppState>,
    text: String,
) -> CommandResult<ImportSummary> {
    let app_state = state.inner().clone();
    debug!(target: "app::command", bytes = text.len(), "dataset_import_csv invoked");
    run_blocking(move || {
        let dataset = app_state.dataset();
        let records_imported = dataset.import_csv(&text)?;
        Ok(ImportSummary {
            records_imported,
            periods: dataset.periods()?,
            sample_mode: dataset.is_sample_mode(),
        })
    })
    .await
}

#[tauri::command]
pub async fn dataset_load_sample(state: State<'_, AppState>) -> CommandResult<ImportSummary> {
    let app_state = state.inner().clone();
    debug!(target: "app::command", "dataset_load_sample invoked");
    run_blocking(move || {
        let dataset = app_state.dataset();
        let records_imported = dataset.load_sample()?;
        Ok(ImportSummary {
            records_imported,
            periods: dataset.periods()?,
            sample_mode: dataset.is_sample_mode(),
        })
    })
    .await
}

#[tauri::command]
pub async fn dataset_clear(state: State<'_, AppState>) -> CommandResult<()> {
    let app_state = state.inner().clone();
    debug!(target: "app::command", "dataset_clear invoked");
    run_blocking(move || app_state.dataset().clear()).await
}

#[tauri::command]
pub async fn dataset_periods(state: State<'_, AppState>) -> CommandResult<Vec<String>> {
    let app_state = state.inner().clone();
    run_blocking(move || app_state.dataset().periods()).await
}

#[tauri::command]
pub async fn dataset_records(state: State<'_, AppState>) -> CommandResult<Vec<KpiRecord>> {
    let app_state = state.inner().clone();
    run_blocking(move || app_state.dataset().records()).await
}

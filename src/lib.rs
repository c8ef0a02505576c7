pub mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    if let Err(error) = try_run() {
        eprintln!("failed to launch application: {error}");
    }
}

fn try_run() -> Result<(), Box<dyn std::error::Error>> {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let handle = app.handle();

            crate::utils::logger::init_logging(handle)
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;

            let state = crate::commands::AppState::new()
                .map_err(|err| Box::new(err) as Box<dyn std::error::Error>)?;
            app.manage(state);

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            crate::commands::dataset::dataset_import_csv,
            crate::commands::dataset::dataset_load_sample,
            crate::commands::dataset::dataset_clear,
            crate::commands::dataset::dataset_periods,
            crate::commands::dataset::dataset_records,
            crate::commands::dashboard::dashboard_overview_fetch,
            crate::commands::dashboard::dashboard_leaderboard_fetch,
            crate::commands::dashboard::dashboard_employee_detail_fetch,
            crate::commands::agent_commands::insights_generate,
            crate::commands::agent_commands::insights_state_fetch,
            crate::commands::agent_commands::chat_send,
            crate::commands::agent_commands::chat_history_fetch,
            crate::commands::agent_commands::chat_suggestions,
            crate::commands::agent_commands::agent_status,
        ])
        .run(tauri::generate_context!())?;

    Ok(())
}

pub mod agent_service;
pub mod csv_import;
pub mod dashboard_service;
pub mod dataset_service;
pub mod insights_service;
pub mod prompt_templates;

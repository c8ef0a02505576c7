pub mod agent;
pub mod dashboard;
pub mod record;

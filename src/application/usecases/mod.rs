pub mod artifact_upload;
pub mod refresh_open_orders;
pub mod sync_orchestrator;

pub mod artifact_uploader;
pub mod connectivity;
pub mod sync_runner;

use std::path::PathBuf;

use url::Url;

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub bridge_server: BridgeServer,
    pub delivery_api: DeliveryApi,
    pub storage: Storage,
    pub sync: SyncTuning,
    pub background_sync: BackgroundSync,
}

#[derive(Debug, Clone)]
pub struct BridgeServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone)]
pub struct DeliveryApi {
    pub base_url: Url,
    pub token: Option<String>,
    pub timeout_secs: u64,
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Storage {
    pub data_dir: PathBuf,
    pub media_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SyncTuning {
    pub inter_record_delay_ms: u64,
    pub connectivity_poll_secs: u64,
    pub order_feed_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct BackgroundSync {
    pub task_name: String,
    pub interval_secs: u64,
}

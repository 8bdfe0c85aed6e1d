use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use url::Url;

use super::{
    config_model::{
        BackgroundSync, BridgeServer, DeliveryApi, DotEnvyConfig, Storage, SyncTuning,
    },
    stage::Stage,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup, so tests do not touch process env.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let var = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let stage = match var("STAGE") {
        Some(stage) => stage.parse().context("STAGE is invalid")?,
        None => Stage::default(),
    };

    let bridge_server = BridgeServer {
        port: parse_or(&var, "SERVER_PORT_BRIDGE", 8686)?,
        timeout: parse_or(&var, "SERVER_TIMEOUT", 90)?,
        body_limit: parse_or(&var, "SERVER_BODY_LIMIT", 10)?,
    };

    let base_url = var("DELIVERY_API_BASE_URL").context("DELIVERY_API_BASE_URL is invalid")?;
    let delivery_api = DeliveryApi {
        base_url: Url::parse(&base_url).context("DELIVERY_API_BASE_URL is invalid")?,
        token: var("DELIVERY_API_TOKEN"),
        timeout_secs: parse_or(&var, "DELIVERY_API_TIMEOUT_SECS", 30)?,
        probe_timeout_secs: parse_or(&var, "DELIVERY_API_PROBE_TIMEOUT_SECS", 5)?,
    };

    let storage = Storage {
        data_dir: PathBuf::from(var("SYNC_DATA_DIR").unwrap_or_else(|| "./data".to_string())),
        media_dir: PathBuf::from(var("SYNC_MEDIA_DIR").unwrap_or_else(|| "./media".to_string())),
    };

    let sync = SyncTuning {
        inter_record_delay_ms: parse_or(&var, "SYNC_INTER_RECORD_DELAY_MS", 500)?,
        connectivity_poll_secs: parse_or(&var, "CONNECTIVITY_POLL_SECS", 30)?,
        order_feed_interval_secs: parse_or(&var, "ORDER_FEED_INTERVAL_SECS", 300)?,
    };

    let background_sync = BackgroundSync {
        task_name: var("BACKGROUND_SYNC_TASK_NAME")
            .unwrap_or_else(|| "delivery-background-sync".to_string()),
        interval_secs: parse_or(&var, "BACKGROUND_SYNC_INTERVAL_SECS", 900)?,
    };

    Ok(DotEnvyConfig {
        stage,
        bridge_server,
        delivery_api,
        storage,
        sync,
        background_sync,
    })
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(value) => value.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

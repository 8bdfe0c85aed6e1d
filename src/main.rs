use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use delivery_sync::{
    application::{
        interfaces::{connectivity::ConnectivityCheck, sync_runner::SyncRunner},
        usecases::{
            refresh_open_orders::RefreshOpenOrdersUseCase,
            sync_orchestrator::{SyncOrchestrator, SyncSettings},
        },
    },
    background_worker::sync_scheduler::{BackgroundScheduler, BackgroundTaskConfig},
    config,
    domain::{
        repositories::{
            delivery_transport::DeliveryTransport, order_feed::OrderFeed,
            record_store::RecordStore,
        },
        value_objects::connectivity::ConnectivityEvent,
    },
    infrastructure::{
        axum_http::{self, http_serve::BridgeServices},
        http_client::delivery_api::{DeliveryApiClient, DeliveryApiConfig},
        kv_store::{KeyValueStore, json_file::JsonFileStore},
        repositories::record_store::KvRecordStore,
    },
    observability,
    services::{
        connectivity_monitor::{ConnectivityMonitor, ReachabilityProbe, run_connectivity_loop},
        order_feed_loop::run_order_feed_loop,
    },
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        eprintln!("delivery-sync exited with error: {error:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let dotenvy_env = Arc::new(config::config_loader::load()?);
    observability::init_observability("delivery-sync", dotenvy_env.stage)?;
    info!("ENV has been loaded");

    let kv: Arc<dyn KeyValueStore + Send + Sync> = Arc::new(
        JsonFileStore::open(&dotenvy_env.storage.data_dir)
            .await
            .context("failed to open data directory")?,
    );
    let record_store: Arc<dyn RecordStore + Send + Sync> = Arc::new(KvRecordStore::new(kv));
    info!(data_dir = %dotenvy_env.storage.data_dir.display(), "Record store is ready");

    let api = &dotenvy_env.delivery_api;
    let api_client = Arc::new(DeliveryApiClient::new(DeliveryApiConfig {
        base_url: api.base_url.clone(),
        token: api.token.clone(),
        timeout_secs: api.timeout_secs,
        probe_timeout_secs: api.probe_timeout_secs,
    })?);
    let transport: Arc<dyn DeliveryTransport + Send + Sync> = api_client.clone();
    let order_feed: Arc<dyn OrderFeed + Send + Sync> = api_client;

    let probe = Arc::new(ReachabilityProbe::new(Arc::clone(&transport)));
    let connectivity: Arc<dyn ConnectivityCheck + Send + Sync> = probe.clone();

    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::clone(&record_store),
        transport,
        connectivity,
        SyncSettings {
            inter_record_delay: Duration::from_millis(dotenvy_env.sync.inter_record_delay_ms),
            media_root: dotenvy_env.storage.media_dir.clone(),
        },
    ));
    let runner: Arc<dyn SyncRunner + Send + Sync> = orchestrator.clone();

    let monitor = Arc::new(ConnectivityMonitor::new(probe, Arc::clone(&runner)));
    let _reachability_log = monitor.subscribe(Arc::new(|event: ConnectivityEvent| {
        info!(
            reachable = event.reachable,
            previously_reachable = ?event.previously_reachable,
            "Backend reachability changed"
        );
    }));

    let scheduler = Arc::new(BackgroundScheduler::new(runner));
    scheduler.register(BackgroundTaskConfig {
        name: dotenvy_env.background_sync.task_name.clone(),
        interval: Duration::from_secs(dotenvy_env.background_sync.interval_secs),
    });

    let open_orders = Arc::new(RefreshOpenOrdersUseCase::new(record_store, order_feed));

    // Spawn background loops
    let connectivity_loop = tokio::spawn(run_connectivity_loop(
        Arc::clone(&monitor),
        Duration::from_secs(dotenvy_env.sync.connectivity_poll_secs),
    ));
    let order_feed_loop = tokio::spawn(run_order_feed_loop(
        Arc::clone(&open_orders),
        Duration::from_secs(dotenvy_env.sync.order_feed_interval_secs),
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let services = BridgeServices {
        orchestrator,
        monitor,
        scheduler,
        open_orders,
    };
    let bridge = tokio::spawn(async move { axum_http::http_serve::start(server_config, services).await });

    tokio::select! {
        result = connectivity_loop => result??,
        result = order_feed_loop => result??,
        result = bridge => result??,
    };
    Ok(())
}

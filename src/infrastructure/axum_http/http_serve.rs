use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{error, info};

use crate::{
    application::usecases::{
        refresh_open_orders::RefreshOpenOrdersUseCase, sync_orchestrator::SyncOrchestrator,
    },
    background_worker::sync_scheduler::BackgroundScheduler,
    config::config_model::DotEnvyConfig,
    infrastructure::axum_http::{default_routers, routers},
    services::connectivity_monitor::ConnectivityMonitor,
};

/// Components the host shell reaches through the bridge.
#[derive(Clone)]
pub struct BridgeServices {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub scheduler: Arc<BackgroundScheduler>,
    pub open_orders: Arc<RefreshOpenOrdersUseCase>,
}

pub fn router(config: &DotEnvyConfig, services: BridgeServices) -> Result<Router> {
    let allowed_origins: Vec<HeaderValue> = vec![
        "http://localhost".parse()?,
        "http://127.0.0.1".parse()?,
    ];

    let body_limit = body_limit_bytes(config.bridge_server.body_limit)?;

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/internal/deliveries",
            routers::deliveries::routes(Arc::clone(&services.orchestrator)),
        )
        .nest(
            "/internal/records",
            routers::records::routes(services.orchestrator),
        )
        .nest(
            "/internal/background-sync",
            routers::background_sync::routes(
                services.scheduler,
                &config.background_sync.task_name,
            ),
        )
        .nest(
            "/internal/connectivity",
            routers::connectivity::routes(services.monitor),
        )
        .nest(
            "/internal/open-orders",
            routers::open_orders::routes(services.open_orders),
        )
        .route("/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.bridge_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([CONTENT_TYPE])
                .allow_origin(allowed_origins),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

/// `SERVER_BODY_LIMIT` is in megabytes.
fn body_limit_bytes(megabytes: u64) -> Result<usize> {
    megabytes
        .checked_mul(1024 * 1024)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .context("SERVER_BODY_LIMIT is too large")
}

pub async fn start(config: Arc<DotEnvyConfig>, services: BridgeServices) -> Result<()> {
    let app = router(&config, services)?;

    // The bridge is only meant for the host shell on the same device.
    let addr = SocketAddr::from(([127, 0, 0, 1], config.bridge_server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind bridge on {addr}"))?;
    info!("Host bridge running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::{
            interfaces::connectivity::MockConnectivityCheck,
            usecases::sync_orchestrator::SyncSettings,
        },
        config::config_loader,
        domain::repositories::{
            delivery_transport::MockDeliveryTransport, order_feed::MockOrderFeed,
        },
        infrastructure::{
            kv_store::memory::MemoryKeyValueStore, repositories::record_store::KvRecordStore,
        },
        services::connectivity_monitor::ReachabilityProbe,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::path::PathBuf;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = config_loader::load_from(|key| {
            (key == "DELIVERY_API_BASE_URL").then(|| "https://api.example.com/".to_string())
        })
        .unwrap();

        let store = Arc::new(KvRecordStore::new(Arc::new(MemoryKeyValueStore::default())));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            store.clone(),
            Arc::new(MockDeliveryTransport::new()),
            Arc::new(MockConnectivityCheck::new()),
            SyncSettings {
                inter_record_delay: Duration::ZERO,
                media_root: PathBuf::from("/media"),
            },
        ));
        let probe = Arc::new(ReachabilityProbe::new(Arc::new(MockDeliveryTransport::new())));
        let services = BridgeServices {
            monitor: Arc::new(ConnectivityMonitor::new(probe, orchestrator.clone())),
            scheduler: Arc::new(BackgroundScheduler::new(orchestrator.clone())),
            open_orders: Arc::new(RefreshOpenOrdersUseCase::new(
                store,
                Arc::new(MockOrderFeed::new()),
            )),
            orchestrator,
        };
        router(&config, services).unwrap()
    }

    #[test]
    fn body_limit_rejects_overflowing_megabytes() {
        assert_eq!(body_limit_bytes(10).unwrap(), 10 * 1024 * 1024);
        assert!(body_limit_bytes(u64::MAX).is_err());
    }

    #[tokio::test]
    async fn health_check_and_fallback() {
        let response = app()
            .oneshot(Request::builder().uri("/health-check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app()
            .oneshot(Request::builder().uri("/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn offline_report_answers_unreachable_without_probing() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/internal/connectivity")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"status":"offline"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["reachable"], false);
    }
}

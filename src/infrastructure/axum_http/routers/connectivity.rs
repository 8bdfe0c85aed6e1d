use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;

use crate::{
    domain::value_objects::connectivity::NetworkStatus,
    services::connectivity_monitor::ConnectivityMonitor,
};

pub fn routes(monitor: Arc<ConnectivityMonitor>) -> Router {
    Router::new()
        .route("/", post(network_changed))
        .with_state(monitor)
}

#[derive(Debug, Deserialize)]
pub struct NetworkChangeRequest {
    pub status: NetworkStatus,
}

/// Host OS network-state notification. Answers with the probed reachability;
/// a restored connection starts a batch pass in the background.
pub async fn network_changed(
    State(monitor): State<Arc<ConnectivityMonitor>>,
    Json(payload): Json<NetworkChangeRequest>,
) -> impl IntoResponse {
    Json(monitor.handle_network_change(payload.status).await)
}

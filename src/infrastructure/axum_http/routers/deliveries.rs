use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use tracing::{error, info};

use crate::{
    application::usecases::sync_orchestrator::SyncOrchestrator,
    domain::{
        entities::deliveries::DeliveryOutcome, errors::SyncError,
        value_objects::sync_results::SubmitResult,
    },
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_BRIDGE/internal/deliveries" \
//     -H "Content-Type: application/json" \
//     -d @captured_delivery.json

pub fn routes(orchestrator: Arc<SyncOrchestrator>) -> Router {
    Router::new()
        .route("/", post(submit_delivery))
        .with_state(orchestrator)
}

pub async fn submit_delivery(
    State(orchestrator): State<Arc<SyncOrchestrator>>,
    Json(outcome): Json<DeliveryOutcome>,
) -> Response {
    let key = outcome.business_key();

    match orchestrator.submit_now(outcome).await {
        Ok(result) => {
            let status = match result {
                SubmitResult::Synced { .. } => StatusCode::CREATED,
                SubmitResult::Queued { .. } | SubmitResult::RetryScheduled { .. } => {
                    StatusCode::ACCEPTED
                }
            };
            info!(key = %key, record_id = %result.record_id(), "submit_delivery: handled");
            (status, Json(result)).into_response()
        }
        Err(SyncError::DuplicateKey(key)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "duplicate_delivery",
                "message": format!("delivery already processed: {key}"),
            })),
        )
            .into_response(),
        Err(err) => {
            error!(key = %key, error = ?err, "submit_delivery: usecase failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "submit delivery failed").into_response()
        }
    }
}

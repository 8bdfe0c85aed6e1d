use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use tracing::error;
use uuid::Uuid;

use crate::{
    application::usecases::sync_orchestrator::SyncOrchestrator, domain::errors::SyncError,
};

pub fn routes(orchestrator: Arc<SyncOrchestrator>) -> Router {
    Router::new()
        .route("/", get(list_records))
        .route("/:record_id", delete(discard_record))
        .with_state(orchestrator)
}

pub async fn list_records(State(orchestrator): State<Arc<SyncOrchestrator>>) -> Response {
    match orchestrator.list_records().await {
        Ok(records) => Json(records).into_response(),
        Err(err) => {
            error!(error = ?err, "list_records: usecase failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "list records failed").into_response()
        }
    }
}

pub async fn discard_record(
    State(orchestrator): State<Arc<SyncOrchestrator>>,
    Path(record_id): Path<Uuid>,
) -> Response {
    match orchestrator.discard_record(record_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "record not found").into_response(),
        Err(SyncError::Busy) => {
            (StatusCode::CONFLICT, "sync in progress, try again").into_response()
        }
        Err(err) => {
            error!(%record_id, error = ?err, "discard_record: usecase failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "discard record failed").into_response()
        }
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
        domain::{
            entities::{
                deliveries::{DeliveryOutcome, GeoPoint},
                sync_records::SyncRecord,
            },
            repositories::{delivery_transport::MockDeliveryTransport, record_store::RecordStore},
            value_objects::{
                artifacts::DeliveryArtifacts,
                enums::{delivery_types::DeliveryType, sync_states::SyncState},
            },
        },
        infrastructure::{
            kv_store::memory::MemoryKeyValueStore, repositories::record_store::KvRecordStore,
        },
    };
    use axum::{body::Body, http::Request};
    use chrono::Utc;
    use std::{path::PathBuf, time::Duration};
    use tower::ServiceExt;

    fn app(store: Arc<KvRecordStore>) -> Router {
        let orchestrator = SyncOrchestrator::new(
            store,
            Arc::new(MockDeliveryTransport::new()),
            Arc::new(MockConnectivityCheck::new()),
            SyncSettings {
                inter_record_delay: Duration::ZERO,
                media_root: PathBuf::from("/media"),
            },
        );
        routes(Arc::new(orchestrator))
    }

    fn record() -> SyncRecord {
        SyncRecord::new(
            DeliveryOutcome {
                order_id: "PED-1".to_string(),
                folio: "F-1".to_string(),
                delivery_type: DeliveryType::NotDelivered,
                line_items: vec![],
                comments: Some("closed".to_string()),
                reporter_name: "Driver".to_string(),
                location: GeoPoint {
                    latitude: 0.0,
                    longitude: 0.0,
                },
                captured_at: Utc::now(),
                artifacts: DeliveryArtifacts::default(),
            },
            SyncState::Error,
        )
    }

    #[tokio::test]
    async fn discard_returns_no_content_then_not_found() {
        let store = Arc::new(KvRecordStore::new(Arc::new(MemoryKeyValueStore::default())));
        let record = record();
        let uri = format!("/{}", record.id);
        store.insert_record(record).await.unwrap();
        let app = app(store.clone());

        let delete_request = || {
            Request::builder()
                .method("DELETE")
                .uri(&uri)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.list_pending_records().await.unwrap().is_empty());

        let response = app.oneshot(delete_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_pending_records() {
        let store = Arc::new(KvRecordStore::new(Arc::new(MemoryKeyValueStore::default())));
        store.insert_record(record()).await.unwrap();

        let response = app(store)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body[0]["state"], "ERROR");
        assert_eq!(body[0]["outcome"]["order_id"], "PED-1");
    }
}

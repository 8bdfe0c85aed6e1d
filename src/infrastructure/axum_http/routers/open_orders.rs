use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tracing::{error, warn};

use crate::{
    application::usecases::refresh_open_orders::RefreshOpenOrdersUseCase, domain::errors::SyncError,
};

pub fn routes(usecase: Arc<RefreshOpenOrdersUseCase>) -> Router {
    Router::new()
        .route("/", get(list_open_orders))
        .route("/refresh", post(refresh_open_orders))
        .with_state(usecase)
}

pub async fn list_open_orders(State(usecase): State<Arc<RefreshOpenOrdersUseCase>>) -> Response {
    match usecase.list_open_orders().await {
        Ok(groups) => Json(groups).into_response(),
        Err(err) => {
            error!(error = ?err, "list_open_orders: usecase failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "list open orders failed").into_response()
        }
    }
}

pub async fn refresh_open_orders(State(usecase): State<Arc<RefreshOpenOrdersUseCase>>) -> Response {
    match usecase.refresh().await {
        Ok(appended) => Json(json!({ "appended": appended })).into_response(),
        Err(SyncError::Transport(err)) => {
            warn!(error = %err, "refresh_open_orders: backend unavailable");
            (StatusCode::BAD_GATEWAY, "order feed unavailable").into_response()
        }
        Err(err) => {
            error!(error = ?err, "refresh_open_orders: usecase failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "refresh open orders failed").into_response()
        }
    }
}

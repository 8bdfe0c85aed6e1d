use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Serialize;

use crate::{
    background_worker::sync_scheduler::BackgroundScheduler,
    domain::value_objects::enums::background_fetch_results::BackgroundFetchResult,
};

/// Lets the host shell fire the registered background task on its own schedule.
#[derive(Clone)]
pub struct BackgroundSyncRouteState {
    scheduler: Arc<BackgroundScheduler>,
    task_name: Arc<str>,
}

pub fn routes(scheduler: Arc<BackgroundScheduler>, task_name: &str) -> Router {
    Router::new()
        .route("/", post(run_background_sync))
        .with_state(BackgroundSyncRouteState {
            scheduler,
            task_name: Arc::from(task_name),
        })
}

#[derive(Debug, Serialize)]
pub struct BackgroundSyncResponse {
    pub task: String,
    pub result: BackgroundFetchResult,
}

pub async fn run_background_sync(State(state): State<BackgroundSyncRouteState>) -> impl IntoResponse {
    let result = state.scheduler.run_once(&state.task_name).await;
    Json(BackgroundSyncResponse {
        task: state.task_name.to_string(),
        result,
    })
}

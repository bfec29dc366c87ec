use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::http_server::{error::Report, state::AppState};
use crate::services::auto_sync::AutoSyncStatus;

pub async fn start(State(app_state): State<Arc<AppState>>) -> Result<Json<AutoSyncStatus>, Report> {
    app_state.auto_sync.start().await?;
    Ok(Json(app_state.auto_sync.status().await))
}

pub async fn stop(State(app_state): State<Arc<AppState>>) -> Json<AutoSyncStatus> {
    app_state.auto_sync.stop();
    Json(app_state.auto_sync.status().await)
}

pub async fn status(State(app_state): State<Arc<AppState>>) -> Json<AutoSyncStatus> {
    Json(app_state.auto_sync.status().await)
}

pub async fn run_now(State(app_state): State<Arc<AppState>>) -> Result<StatusCode, Report> {
    app_state.auto_sync.run_now().await?;
    Ok(StatusCode::ACCEPTED)
}

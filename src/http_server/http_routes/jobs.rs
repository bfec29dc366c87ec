use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::http_server::{error::Report, state::AppState};
use crate::services::credentials::TargetAuth;
use crate::services::jobs::executor::{JobRequest, SelectedPlaylist};
use crate::services::jobs::model::Job;

#[derive(Debug, Clone, Deserialize)]
pub struct TransferAllInput {
    /// Source access token; the stored one is used when absent.
    #[serde(default)]
    source_token: Option<String>,
    #[serde(flatten)]
    target: TargetAuth,
    /// Only transfer these source playlists.
    #[serde(default)]
    playlist_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferSelectedInput {
    #[serde(flatten)]
    target: TargetAuth,
    playlists: Vec<SelectedPlaylist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransferLinkInput {
    #[serde(flatten)]
    target: TargetAuth,
    playlist_link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAllInput {
    #[serde(flatten)]
    target: TargetAuth,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteSelectedInput {
    #[serde(flatten)]
    target: TargetAuth,
    playlist_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    job_id: String,
    total: usize,
}

async fn submit(
    app_state: &AppState,
    request: JobRequest,
) -> Result<(StatusCode, Json<JobAccepted>), Report> {
    let job_id = app_state.executor.submit_job(request).await?;
    let total = app_state.executor.job_status(&job_id)?.counters.total;
    Ok((StatusCode::ACCEPTED, Json(JobAccepted { job_id, total })))
}

pub async fn transfer_all(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<TransferAllInput>,
) -> Result<(StatusCode, Json<JobAccepted>), Report> {
    submit(
        &app_state,
        JobRequest::TransferAll {
            source_token: input.source_token,
            target: input.target,
            playlist_ids: input.playlist_ids,
        },
    )
    .await
}

pub async fn transfer_selected(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<TransferSelectedInput>,
) -> Result<(StatusCode, Json<JobAccepted>), Report> {
    submit(
        &app_state,
        JobRequest::TransferSelected {
            target: input.target,
            playlists: input.playlists,
        },
    )
    .await
}

pub async fn transfer_link(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<TransferLinkInput>,
) -> Result<(StatusCode, Json<JobAccepted>), Report> {
    submit(
        &app_state,
        JobRequest::TransferLink {
            target: input.target,
            link: input.playlist_link,
        },
    )
    .await
}

pub async fn delete_all(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<DeleteAllInput>,
) -> Result<(StatusCode, Json<JobAccepted>), Report> {
    submit(&app_state, JobRequest::DeleteAll { target: input.target }).await
}

pub async fn delete_selected(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<DeleteSelectedInput>,
) -> Result<(StatusCode, Json<JobAccepted>), Report> {
    submit(
        &app_state,
        JobRequest::DeleteSelected {
            target: input.target,
            playlist_ids: input.playlist_ids,
        },
    )
    .await
}

pub async fn job_status(
    State(app_state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, Report> {
    Ok(Json(app_state.executor.job_status(&job_id)?))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    job_id: String,
    cancelled: bool,
}

pub async fn cancel_job(
    State(app_state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<CancelResponse>, Report> {
    app_state.executor.cancel_job(&job_id)?;
    Ok(Json(CancelResponse {
        job_id,
        cancelled: true,
    }))
}

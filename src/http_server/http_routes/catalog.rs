use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::error::MigrationError;
use crate::http_server::{error::Report, state::AppState};
use crate::ports::source::{SourcePlaylist, SourceTrack};
use crate::services::credentials::TargetAuth;
use crate::services::jobs::executor::TargetPlaylistSummary;

/// Target library playlists, using stored credentials.
pub async fn target_playlists(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TargetPlaylistSummary>>, Report> {
    let playlists = app_state
        .executor
        .list_target_playlists(&TargetAuth::default())
        .await?;
    Ok(Json(playlists))
}

/// Target library playlists, using the supplied credentials.
pub async fn target_playlists_with(
    State(app_state): State<Arc<AppState>>,
    Json(auth): Json<TargetAuth>,
) -> Result<Json<Vec<TargetPlaylistSummary>>, Report> {
    Ok(Json(app_state.executor.list_target_playlists(&auth).await?))
}

pub async fn source_playlists(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<SourcePlaylist>>, Report> {
    let token = app_state
        .executor
        .credentials()
        .source_access_token()
        .await
        .ok_or_else(|| MigrationError::CredentialMissing("source access token is required".into()))?;

    let playlists = app_state
        .executor
        .source()
        .list_user_playlists(&token)
        .await
        .map_err(MigrationError::catalog)?;
    Ok(Json(playlists))
}

#[derive(Debug, Serialize)]
pub struct IndexedTrack {
    index: usize,
    #[serde(flatten)]
    track: SourceTrack,
}

pub async fn source_playlist_tracks(
    State(app_state): State<Arc<AppState>>,
    Path(playlist_id): Path<String>,
) -> Result<Json<Vec<IndexedTrack>>, Report> {
    let details = app_state
        .executor
        .source()
        .get_playlist_details(&playlist_id)
        .await
        .map_err(MigrationError::catalog)?;

    Ok(Json(
        details
            .tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| IndexedTrack { index, track })
            .collect(),
    ))
}

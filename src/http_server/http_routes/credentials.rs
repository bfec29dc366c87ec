use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::MigrationError;
use crate::http_server::{error::Report, state::AppState};
use crate::services::credentials::TargetAuth;

/// Tokens obtained by the source OAuth flow.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceTokensInput {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

pub async fn store_source(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<SourceTokensInput>,
) -> Result<StatusCode, Report> {
    app_state
        .executor
        .credentials()
        .store_source_tokens(input.access_token, input.refresh_token, input.expires_in)
        .await?;
    tracing::info!("Stored source tokens");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn store_target(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<TargetAuth>,
) -> Result<StatusCode, Report> {
    let credentials = app_state.executor.credentials();
    let headers = input.headers.filter(|h| !h.trim().is_empty());

    match (headers, input.oauth) {
        (Some(headers), _) => credentials.store_target_headers(headers).await?,
        (None, Some(oauth)) => credentials.store_target_oauth(oauth).await?,
        (None, None) => {
            return Err(MigrationError::CredentialMissing(
                "headers or oauth must be provided".into(),
            )
            .into());
        }
    }
    tracing::info!("Stored target credentials");
    Ok(StatusCode::NO_CONTENT)
}

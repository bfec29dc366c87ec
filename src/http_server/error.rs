use axum::{
    Json,
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};
use serde_json::json;

use crate::error::MigrationError;

// A generic error report
// Produced via `Err(some_err).wrap_err("Some context")`
// or `Err(color_eyre::eyre::Report::new(SomeError))`
pub struct Report(color_eyre::Report);

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> From<E> for Report
where
    E: Into<color_eyre::Report>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn status_for(err: &MigrationError) -> StatusCode {
    match err {
        MigrationError::JobNotFound(_) => StatusCode::NOT_FOUND,
        MigrationError::JobIdTaken(_) => StatusCode::CONFLICT,
        MigrationError::CredentialMissing(_) | MigrationError::NothingToTransfer(_) => {
            StatusCode::BAD_REQUEST
        }
        MigrationError::RefreshFailed(_) => StatusCode::UNAUTHORIZED,
        MigrationError::CatalogRequestFailed(_) => StatusCode::BAD_GATEWAY,
        MigrationError::NoMatches { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

// Tell axum how to convert `Report` into a response.
impl IntoResponse for Report {
    fn into_response(self) -> Response<Body> {
        let err = self.0;

        if let Some(migration_error) = err.downcast_ref::<MigrationError>() {
            let status = status_for(migration_error);
            tracing::warn!("Request failed with {status}: {migration_error}");
            return (status, Json(json!({ "error": migration_error.to_string() }))).into_response();
        }

        tracing::error!("{err:?}");

        // Fallback
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Something went wrong" })),
        )
            .into_response()
    }
}

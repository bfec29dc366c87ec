use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use color_eyre::eyre::{Context, eyre};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::http_server::{http_routes, state::AppState};

async fn root(State(app_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "jobs": app_state.executor.registry().len(),
    }))
}

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/transfers/all", post(http_routes::jobs::transfer_all))
        .route("/transfers/selected", post(http_routes::jobs::transfer_selected))
        .route("/transfers/link", post(http_routes::jobs::transfer_link))
        .route("/deletions/all", post(http_routes::jobs::delete_all))
        .route("/deletions/selected", post(http_routes::jobs::delete_selected))
        .route("/jobs/{job_id}", get(http_routes::jobs::job_status))
        .route("/jobs/{job_id}/cancel", post(http_routes::jobs::cancel_job))
        .route(
            "/target/playlists",
            get(http_routes::catalog::target_playlists)
                .post(http_routes::catalog::target_playlists_with),
        )
        .route("/source/playlists", get(http_routes::catalog::source_playlists))
        .route(
            "/source/playlists/{playlist_id}/tracks",
            get(http_routes::catalog::source_playlist_tracks),
        )
        .route("/credentials/source", post(http_routes::credentials::store_source))
        .route("/credentials/target", post(http_routes::credentials::store_target))
        .route("/auto-sync/start", post(http_routes::auto_sync::start))
        .route("/auto-sync/stop", post(http_routes::auto_sync::stop))
        .route("/auto-sync/run-now", post(http_routes::auto_sync::run_now))
        .route("/auto-sync/status", get(http_routes::auto_sync::status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state)
}

pub async fn start(port: u16, app_state: Arc<AppState>) -> color_eyre::Result<()> {
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", port))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::projects;
use crate::state::AppState;
use crate::webhooks;

/// All routes with tracing and a per-request timeout.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let webhook_routes = Router::new()
        .route(
            "/api/webhooks/clerk/organization/general",
            post(webhooks::clerk_organization_general),
        )
        .route(
            "/api/webhooks/clerk/organization/membership",
            post(webhooks::clerk_organization_membership),
        )
        .route("/api/webhooks/clerk/user", post(webhooks::clerk_user))
        .route("/api/webhooks/mux", post(webhooks::mux));

    let project_routes = Router::new()
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/{project_id}/upload-url",
            post(projects::create_upload_url),
        );

    Router::new()
        .route("/health", get(health))
        .merge(webhook_routes)
        .merge(project_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind `addr` and serve until SIGINT or SIGTERM.
pub async fn serve(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

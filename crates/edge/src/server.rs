//! Edge HTTP server: the route gate in front of the page tree

use crate::Result;
use crate::config::Settings;
use axum::{Json, Router, http::StatusCode, routing::get};
use portal_http::{GatePolicy, with_route_gate};
use serde::Serialize;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Build the complete router: health check, page tree and gate
///
/// # Errors
///
/// Returns an error if the gate configuration is invalid
pub fn build_router(settings: &Settings) -> Result<Router> {
    let policy = GatePolicy::new(settings.gate.clone())?;
    info!(
        rules = policy.access_table().rules().len(),
        "Route gate configured"
    );

    let mut router = Router::new().route("/health", get(health));

    router = match &settings.server.static_dir {
        Some(static_dir) if static_dir.is_dir() => {
            info!("Serving pages from: {}", static_dir.display());
            router.fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        }
        Some(static_dir) => {
            warn!("Static directory not found: {}", static_dir.display());
            router.fallback(not_found)
        }
        None => router.fallback(not_found),
    };

    Ok(with_route_gate(router, Arc::new(policy)).layer(TraceLayer::new_for_http()))
}

/// Serve until `shutdown` is cancelled
///
/// # Errors
///
/// Returns an error if the router cannot be built or the listener fails
pub async fn serve(settings: &Settings, shutdown: CancellationToken) -> Result<()> {
    let app = build_router(settings)?;
    let listener = TcpListener::bind(settings.server.bind_addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    let grace = Duration::from_secs(settings.server.shutdown_grace_secs);
    let stopping = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            stopping.cancelled().await;
            info!("Shutting down edge server");
        })
        .into_future();

    tokio::select! {
        result = server => result?,
        () = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => warn!("Grace period elapsed with requests still in flight"),
    }

    Ok(())
}

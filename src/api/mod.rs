//! HTTP endpoint for the gauge exporter
//!
//! ## Endpoints
//!
//! - `GET /metrics` - gauges in the Prometheus text exposition format
//! - `GET /health`  - liveness plus registry size

pub mod routes;
pub mod state;

pub use state::ExporterState;

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: ExporterState) -> Router {
    Router::new()
        .route("/metrics", get(routes::metrics))
        .route("/health", get(routes::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the exporter server
///
/// Binds `bind_addr`, serves in a background task and returns the bound
/// address (useful with port 0).
pub async fn spawn_exporter_server(
    bind_addr: SocketAddr,
    state: ExporterState,
) -> anyhow::Result<SocketAddr> {
    info!("starting exporter on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;
    let app = router(state);

    info!("exporter listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("exporter server error: {}", e);
        }
    });

    Ok(addr)
}

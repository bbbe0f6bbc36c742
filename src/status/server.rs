//! Read-only status HTTP server
//!
//! Exposes the composite snapshot to presentation layers (GUI, CLI, probes)
//! without giving them any write path into the orchestrator.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

use crate::status::aggregator::StatusAggregator;

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
    version: &'static str,
    timestamp: chrono::DateTime<Utc>,
}

/// Serves `/healthz` and `/status`
pub struct StatusServer {
    aggregator: Arc<StatusAggregator>,
    addr: SocketAddr,
}

impl StatusServer {
    pub fn new(aggregator: Arc<StatusAggregator>, addr: SocketAddr) -> Self {
        Self { aggregator, addr }
    }

    /// Run until the shutdown signal fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> crate::Result<()> {
        let app = Router::new()
            .route("/healthz", get(liveness_handler))
            .route("/status", get(status_handler))
            .with_state(self.aggregator);

        info!(addr = %self.addr, "status server starting");
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| crate::AdminError::Internal(format!("status server error: {}", e)))?;

        Ok(())
    }
}

/// Liveness probe: the orchestrator process itself is up
async fn liveness_handler() -> impl IntoResponse {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Composite snapshot; 503 when anything managed is not healthy
async fn status_handler(State(aggregator): State<Arc<StatusAggregator>>) -> impl IntoResponse {
    let snapshot = aggregator.get_status().await;
    let code = if snapshot.all_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(snapshot))
}

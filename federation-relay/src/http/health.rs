//! Health check endpoint.

use crate::server::FederationRelay;
use crate::storage::PeerStorage;
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Global start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call once at startup).
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Health status response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Overall status.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Own hostname, if federation is configured.
    pub instance_hostname: Option<String>,
    /// Number of registered peers.
    pub peers: u64,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
}

/// Health check handler.
pub async fn health_handler(
    Extension(relay): Extension<Arc<FederationRelay>>,
) -> Json<HealthStatus> {
    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    // Best effort: a failing store still reports liveness
    let peers = relay.storage().peer_count().await.unwrap_or(0);

    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_hostname: relay.broadcaster().own_hostname().map(str::to_string),
        peers,
        uptime_seconds: uptime,
    })
}

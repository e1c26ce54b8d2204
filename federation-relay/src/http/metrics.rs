//! Prometheus metrics endpoint.

use crate::server::FederationRelay;
use crate::storage::PeerStorage;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(
    Extension(relay): Extension<Arc<FederationRelay>>,
) -> impl IntoResponse {
    let m = relay.metrics();

    // Counters: monotonic since startup
    let received = m.posts_received.load(Ordering::Relaxed);
    let duplicates = m.posts_duplicate.load(Ordering::Relaxed);
    let deletes = m.deletes_received.load(Ordering::Relaxed);
    let removed = m.posts_removed.load(Ordering::Relaxed);
    let broadcasts = m.broadcasts_total.load(Ordering::Relaxed);
    let skipped = m.broadcasts_skipped.load(Ordering::Relaxed);
    let delivered = m.deliveries_succeeded.load(Ordering::Relaxed);
    let failed = m.deliveries_failed.load(Ordering::Relaxed);

    // Gauges: best effort
    let peers = relay.storage().peer_count().await.unwrap_or(0);

    let body = format!(
        r#"# HELP federation_relay_peers Number of registered peers
# TYPE federation_relay_peers gauge
federation_relay_peers {peers}

# HELP federation_relay_info Server information
# TYPE federation_relay_info gauge
federation_relay_info{{version="{version}"}} 1

# HELP federation_relay_posts_received_total Posts pushed by peers, duplicates included
# TYPE federation_relay_posts_received_total counter
federation_relay_posts_received_total {received}

# HELP federation_relay_posts_duplicate_total Posts already recorded for the same origin
# TYPE federation_relay_posts_duplicate_total counter
federation_relay_posts_duplicate_total {duplicates}

# HELP federation_relay_deletes_received_total Delete notices pushed by peers
# TYPE federation_relay_deletes_received_total counter
federation_relay_deletes_received_total {deletes}

# HELP federation_relay_posts_removed_total Posts removed by delete notices
# TYPE federation_relay_posts_removed_total counter
federation_relay_posts_removed_total {removed}

# HELP federation_relay_broadcasts_total Broadcasts fanned out to peers
# TYPE federation_relay_broadcasts_total counter
federation_relay_broadcasts_total {broadcasts}

# HELP federation_relay_broadcasts_skipped_total Broadcasts skipped without an instance hostname
# TYPE federation_relay_broadcasts_skipped_total counter
federation_relay_broadcasts_skipped_total {skipped}

# HELP federation_relay_deliveries_succeeded_total Peer deliveries answered with 2xx
# TYPE federation_relay_deliveries_succeeded_total counter
federation_relay_deliveries_succeeded_total {delivered}

# HELP federation_relay_deliveries_failed_total Peer deliveries that failed or timed out
# TYPE federation_relay_deliveries_failed_total counter
federation_relay_deliveries_failed_total {failed}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

//! Outbound broadcaster.
//!
//! Fans a locally-created post or deletion out to every registered peer
//! except this instance. Deliveries run concurrently, each with its own
//! timeout, and exactly one attempt is made per peer per call. A failing
//! peer is logged and counted; it never affects the others and is never
//! reported to the caller.

use crate::config::FederationConfig;
use crate::error::RelayError;
use crate::server::RelayMetrics;
use crate::storage::{Peer, PeerStorage, SqliteStorage};
use crate::transport::{DeliveryAction, DeliveryError, DeliveryRequest, PeerTransport};
use federation_types::{PeerScheme, PostPayload};
use futures_util::future::join_all;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// What a broadcast call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Own hostname is not configured; nothing was sent.
    Skipped,
    /// Delivery was attempted to `peers` peers (self excluded).
    Dispatched {
        /// Number of peers a delivery was attempted to.
        peers: usize,
    },
}

/// Fans federation events out to peers.
pub struct Broadcaster {
    storage: Arc<SqliteStorage>,
    transport: Arc<dyn PeerTransport>,
    metrics: Arc<RelayMetrics>,
    own_hostname: Option<String>,
    timeout: Duration,
    peer_path_prefix: String,
    tunnel_domains: Vec<String>,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("own_hostname", &self.own_hostname)
            .field("timeout", &self.timeout)
            .field("peer_path_prefix", &self.peer_path_prefix)
            .field("tunnel_domains", &self.tunnel_domains)
            .finish_non_exhaustive()
    }
}

impl Broadcaster {
    /// Create a broadcaster.
    ///
    /// The own hostname is captured from `config` here and never re-read.
    pub fn new(
        config: &FederationConfig,
        storage: Arc<SqliteStorage>,
        transport: Arc<dyn PeerTransport>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            storage,
            transport,
            metrics,
            own_hostname: config.own_hostname().map(str::to_string),
            timeout: config.request_timeout(),
            peer_path_prefix: config.peer_path_prefix.clone(),
            tunnel_domains: config.tunnel_domains.clone(),
        }
    }

    /// This instance's hostname, if federation is configured.
    pub fn own_hostname(&self) -> Option<&str> {
        self.own_hostname.as_deref()
    }

    /// Broadcast a new post to every peer's receive endpoint.
    ///
    /// Returns once every attempt has settled.
    pub async fn broadcast_post(
        &self,
        payload: &PostPayload,
    ) -> Result<BroadcastOutcome, RelayError> {
        tracing::info!(post_id = payload.post_id, "Starting federation for post");
        self.fan_out(DeliveryAction::Post(payload.clone())).await
    }

    /// Broadcast a deletion to every peer's delete endpoint.
    ///
    /// # Errors
    ///
    /// [`RelayError::InvalidArgument`] if `origin_post_id` is `None`; no
    /// peer is contacted in that case.
    pub async fn broadcast_delete(
        &self,
        origin_post_id: Option<i64>,
    ) -> Result<BroadcastOutcome, RelayError> {
        let post_id =
            origin_post_id.ok_or_else(|| RelayError::invalid_argument("post_id is required"))?;

        tracing::info!(post_id, "Starting federated delete");
        self.fan_out(DeliveryAction::Delete { post_id }).await
    }

    /// Scheme used to reach `peer`: the registered one, else inferred from
    /// the hostname.
    pub fn scheme_for(&self, peer: &Peer) -> PeerScheme {
        peer.scheme
            .unwrap_or_else(|| PeerScheme::infer(&peer.hostname, &self.tunnel_domains))
    }

    async fn fan_out(&self, action: DeliveryAction) -> Result<BroadcastOutcome, RelayError> {
        let Some(own_hostname) = self.own_hostname.as_deref() else {
            tracing::info!("Federation skipped, instance hostname not configured");
            self.metrics.broadcasts_skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(BroadcastOutcome::Skipped);
        };

        let peers = self.storage.list_peers().await?;

        let requests: Vec<DeliveryRequest> = peers
            .iter()
            .filter(|peer| {
                if peer.hostname == own_hostname {
                    tracing::debug!("Skipping self-federation to {}", peer.hostname);
                    return false;
                }
                true
            })
            .map(|peer| {
                DeliveryRequest::new(
                    &peer.hostname,
                    self.scheme_for(peer),
                    &self.peer_path_prefix,
                    action.clone(),
                )
            })
            .collect();

        join_all(requests.iter().map(|request| self.attempt(request))).await;

        self.metrics.broadcasts_total.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Broadcast settled for {} peers", requests.len());

        Ok(BroadcastOutcome::Dispatched {
            peers: requests.len(),
        })
    }

    /// One bounded delivery attempt. Failures end here.
    async fn attempt(&self, request: &DeliveryRequest) {
        let result = match tokio::time::timeout(self.timeout, self.transport.deliver(request)).await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout),
        };

        match result {
            Ok(()) => {
                self.metrics
                    .deliveries_succeeded
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(peer = %request.peer, url = %request.url, "Delivered to peer");
            }
            Err(e) => {
                self.metrics.deliveries_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    peer = %request.peer,
                    url = %request.url,
                    error = %e,
                    "Could not deliver to peer"
                );
            }
        }
    }
}

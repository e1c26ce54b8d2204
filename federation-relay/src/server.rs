//! Main FederationRelay coordination.
//!
//! FederationRelay owns storage and wires the registry, receiver and
//! broadcaster together. HTTP handlers share one instance behind an `Arc`.

use crate::broadcaster::Broadcaster;
use crate::config::Config;
use crate::error::RelayError;
use crate::receiver::InboundReceiver;
use crate::registry::PeerRegistry;
use crate::storage::SqliteStorage;
use crate::transport::{HttpTransport, PeerTransport};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Operational metrics for monitoring federation activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total posts received from peers (including duplicates).
    pub posts_received: AtomicU64,
    /// Received posts that were already recorded.
    pub posts_duplicate: AtomicU64,
    /// Total delete notices received from peers.
    pub deletes_received: AtomicU64,
    /// Rows removed by delete notices.
    pub posts_removed: AtomicU64,
    /// Broadcasts that reached the fan-out stage.
    pub broadcasts_total: AtomicU64,
    /// Broadcasts skipped because no own hostname is configured.
    pub broadcasts_skipped: AtomicU64,
    /// Peer deliveries answered with 2xx.
    pub deliveries_succeeded: AtomicU64,
    /// Peer deliveries that failed (network error, timeout, non-2xx).
    pub deliveries_failed: AtomicU64,
}

/// Main relay service.
#[derive(Debug)]
pub struct FederationRelay {
    config: Config,
    storage: Arc<SqliteStorage>,
    metrics: Arc<RelayMetrics>,
    registry: PeerRegistry,
    receiver: InboundReceiver,
    broadcaster: Broadcaster,
}

impl FederationRelay {
    /// Create a relay delivering to peers over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: Config, storage: SqliteStorage) -> Result<Self, RelayError> {
        let transport = HttpTransport::new(&config.federation)?;
        Ok(Self::with_transport(config, storage, Arc::new(transport)))
    }

    /// Create a relay with a custom peer transport.
    pub fn with_transport(
        config: Config,
        storage: SqliteStorage,
        transport: Arc<dyn PeerTransport>,
    ) -> Self {
        let storage = Arc::new(storage);
        let metrics = Arc::new(RelayMetrics::default());
        let broadcaster = Broadcaster::new(
            &config.federation,
            storage.clone(),
            transport,
            metrics.clone(),
        );

        Self {
            registry: PeerRegistry::new(storage.clone()),
            receiver: InboundReceiver::new(storage.clone(), metrics.clone()),
            broadcaster,
            config,
            storage,
            metrics,
        }
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the storage layer.
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Peer registry.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Inbound receiver.
    pub fn receiver(&self) -> &InboundReceiver {
        &self.receiver
    }

    /// Outbound broadcaster.
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }
}

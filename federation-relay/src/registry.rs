//! Peer registry.
//!
//! The durable set of peer instances that broadcasts fan out to. Thin
//! validation layer over [`PeerStorage`]; uniqueness is enforced by the
//! store itself.

use crate::error::RelayError;
use crate::storage::{Peer, PeerStorage, SqliteStorage};
use federation_types::PeerPayload;
use std::sync::Arc;

/// Registry of known peers.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    storage: Arc<SqliteStorage>,
}

impl PeerRegistry {
    /// Create a registry over the given storage.
    pub fn new(storage: Arc<SqliteStorage>) -> Self {
        Self { storage }
    }

    /// Register a peer.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidArgument`] if the hostname is blank.
    /// - [`StorageError::Conflict`](crate::error::StorageError::Conflict) if
    ///   the hostname is already registered.
    pub async fn add_peer(&self, peer: &PeerPayload) -> Result<(), RelayError> {
        let hostname = peer.normalized_hostname()?;
        self.storage.insert_peer(hostname, peer.scheme).await?;

        tracing::info!(peer = %hostname, scheme = ?peer.scheme, "Peer added");
        Ok(())
    }

    /// All registered peers, in no particular order.
    pub async fn list_peers(&self) -> Result<Vec<Peer>, RelayError> {
        Ok(self.storage.list_peers().await?)
    }

    /// Remove a peer.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidArgument`] if the hostname is blank.
    /// - [`StorageError::NotFound`](crate::error::StorageError::NotFound) if
    ///   no such peer is registered.
    pub async fn remove_peer(&self, peer: &PeerPayload) -> Result<(), RelayError> {
        let hostname = peer.normalized_hostname()?;
        self.storage.delete_peer(hostname).await?;

        tracing::info!(peer = %hostname, "Peer removed");
        Ok(())
    }
}

//! Storage layer for federation-relay.
//!
//! Two durable collections: the peer registry and the log of posts
//! received from peers. Every operation runs as its own statement against a
//! pooled connection; there is no long-lived transaction.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::error::StorageError;
use async_trait::async_trait;
use federation_types::{FederatedPostView, PeerScheme};

/// A registered peer instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Network address of the peer, optionally with port.
    pub hostname: String,
    /// Explicit transport scheme, if one was registered.
    pub scheme: Option<PeerScheme>,
}

/// A post received through federation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedPost {
    /// Local surrogate key.
    pub id: i64,
    /// Post id on the origin instance.
    pub origin_post_id: i64,
    /// Author's username on the origin instance.
    pub origin_username: String,
    /// Origin instance as attributed on receipt.
    pub origin_hostname: String,
    /// Post body text.
    pub content: String,
    /// Unix timestamp when the post was received.
    pub received_at: i64,
}

impl From<FederatedPost> for FederatedPostView {
    fn from(post: FederatedPost) -> Self {
        FederatedPostView {
            id: post.id,
            origin_post_id: post.origin_post_id,
            username: post.origin_username,
            instance: post.origin_hostname,
            content: post.content,
            received_at: post.received_at,
        }
    }
}

/// Request to record a received post.
#[derive(Debug, Clone)]
pub struct StorePostRequest {
    /// Post id on the origin instance.
    pub origin_post_id: i64,
    /// Author's username on the origin instance.
    pub origin_username: String,
    /// Origin instance as attributed on receipt.
    pub origin_hostname: String,
    /// Post body text.
    pub content: String,
}

/// Result of recording a received post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptOutcome {
    /// A new row was written.
    Stored,
    /// The same (origin post id, origin hostname) was already recorded.
    Duplicate,
}

/// Trait for peer registry backends.
#[async_trait]
pub trait PeerStorage: Send + Sync {
    /// Register a peer.
    ///
    /// Fails with [`StorageError::Conflict`] if the hostname is already present.
    async fn insert_peer(
        &self,
        hostname: &str,
        scheme: Option<PeerScheme>,
    ) -> Result<(), StorageError>;

    /// List all registered peers. Order is not significant.
    async fn list_peers(&self) -> Result<Vec<Peer>, StorageError>;

    /// Remove a peer.
    ///
    /// Fails with [`StorageError::NotFound`] if no row matched.
    async fn delete_peer(&self, hostname: &str) -> Result<(), StorageError>;

    /// Number of registered peers.
    async fn peer_count(&self) -> Result<u64, StorageError>;
}

/// Trait for federated post backends.
#[async_trait]
pub trait PostStorage: Send + Sync {
    /// Record a received post.
    ///
    /// A second receipt of the same (origin post id, origin hostname) leaves
    /// the stored row untouched and reports [`ReceiptOutcome::Duplicate`].
    async fn insert_post(&self, req: StorePostRequest) -> Result<ReceiptOutcome, StorageError>;

    /// Delete every post matching the origin post id and origin hostname.
    ///
    /// Returns the number of rows removed (zero is not an error).
    async fn delete_posts(
        &self,
        origin_post_id: i64,
        origin_hostname: &str,
    ) -> Result<u64, StorageError>;

    /// List received posts, newest first, up to `limit`.
    async fn list_posts(&self, limit: u32) -> Result<Vec<FederatedPost>, StorageError>;

    /// Count posts matching the origin post id and origin hostname.
    async fn count_posts(
        &self,
        origin_post_id: i64,
        origin_hostname: &str,
    ) -> Result<u64, StorageError>;
}

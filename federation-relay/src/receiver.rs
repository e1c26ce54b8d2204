//! Inbound receiver for posts and deletes pushed by peers.
//!
//! The sender is identified by request metadata only: the first entry of
//! `X-Forwarded-For`, or the direct peer address. That value becomes the
//! origin hostname of the post and is not checked against the registry, so
//! unknown senders are accepted.

use crate::error::RelayError;
use crate::server::RelayMetrics;
use crate::storage::{
    FederatedPost, PostStorage, ReceiptOutcome, SqliteStorage, StorePostRequest,
};
use axum::http::HeaderMap;
use federation_types::PostPayload;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Header carrying the client chain set by the fronting proxy.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Identity reported when neither header nor socket address is available.
pub const UNKNOWN_SENDER: &str = "unknown";

/// Derive the sender identity of an inbound request.
///
/// Uses the first entry of `X-Forwarded-For` if present and non-empty,
/// otherwise the IP of the direct peer address.
pub fn sender_identity(headers: &HeaderMap, direct: Option<SocketAddr>) -> String {
    if let Some(first) = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
    {
        return first.to_string();
    }

    match direct {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_SENDER.to_string(),
    }
}

/// Records posts and deletes received from peers.
#[derive(Debug, Clone)]
pub struct InboundReceiver {
    storage: Arc<SqliteStorage>,
    metrics: Arc<RelayMetrics>,
}

impl InboundReceiver {
    /// Create a receiver over the given storage.
    pub fn new(storage: Arc<SqliteStorage>, metrics: Arc<RelayMetrics>) -> Self {
        Self { storage, metrics }
    }

    /// Record a post pushed by `sender`.
    ///
    /// Repeated receipt of the same post from the same sender is
    /// acknowledged as [`ReceiptOutcome::Duplicate`] without a second row.
    pub async fn receive_post(
        &self,
        payload: PostPayload,
        sender: &str,
    ) -> Result<ReceiptOutcome, RelayError> {
        let post_id = payload.post_id;
        let outcome = self
            .storage
            .insert_post(StorePostRequest {
                origin_post_id: payload.post_id,
                origin_username: payload.username,
                origin_hostname: sender.to_string(),
                content: payload.content,
            })
            .await?;

        self.metrics.posts_received.fetch_add(1, Ordering::Relaxed);
        match outcome {
            ReceiptOutcome::Stored => {
                tracing::info!(sender = %sender, post_id, "Received federated post");
            }
            ReceiptOutcome::Duplicate => {
                self.metrics.posts_duplicate.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(sender = %sender, post_id, "Duplicate federated post ignored");
            }
        }

        Ok(outcome)
    }

    /// Remove every post from `sender` with the given origin post id.
    ///
    /// Returns the number of rows removed; zero is not an error.
    pub async fn receive_delete(
        &self,
        origin_post_id: i64,
        sender: &str,
    ) -> Result<u64, RelayError> {
        let removed = self.storage.delete_posts(origin_post_id, sender).await?;

        self.metrics.deletes_received.fetch_add(1, Ordering::Relaxed);
        self.metrics.posts_removed.fetch_add(removed, Ordering::Relaxed);
        tracing::info!(
            sender = %sender,
            post_id = origin_post_id,
            removed,
            "Received federated delete"
        );

        Ok(removed)
    }

    /// Received posts, newest first.
    pub async fn list_posts(&self, limit: u32) -> Result<Vec<FederatedPost>, RelayError> {
        Ok(self.storage.list_posts(limit).await?)
    }
}

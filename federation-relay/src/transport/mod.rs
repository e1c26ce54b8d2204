//! Outbound delivery to peer instances.
//!
//! The broadcaster hands every peer one [`DeliveryRequest`]; a
//! [`PeerTransport`] turns it into a network call. [`HttpTransport`] talks
//! to real peers over reqwest, [`MockTransport`] records requests in tests.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use federation_types::{PeerScheme, PostPayload};
use thiserror::Error;

/// Per-peer delivery failures.
///
/// These never leave the broadcaster: they are logged and counted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// No response within the per-request timeout.
    #[error("delivery timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("request failed: {0}")]
    Request(String),

    /// Peer answered with a non-2xx status.
    #[error("peer responded with HTTP {0}")]
    Status(u16),
}

/// What a delivery asks the peer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryAction {
    /// `POST {prefix}/receive` with the post as JSON body.
    Post(PostPayload),
    /// `DELETE {prefix}/posts/{post_id}`.
    Delete {
        /// Origin post id being deleted.
        post_id: i64,
    },
}

impl DeliveryAction {
    /// Path of the peer endpoint, relative to the peer's federation prefix.
    pub fn path(&self) -> String {
        match self {
            DeliveryAction::Post(_) => "/receive".to_string(),
            DeliveryAction::Delete { post_id } => format!("/posts/{}", post_id),
        }
    }
}

/// A single delivery attempt to one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    /// Peer hostname as registered.
    pub peer: String,
    /// Fully-qualified target URL.
    pub url: String,
    /// Action to perform.
    pub action: DeliveryAction,
}

impl DeliveryRequest {
    /// Build a request addressed to `peer` over `scheme`.
    ///
    /// `prefix` is the path under which the peer mounts its federation
    /// endpoints (may be empty).
    pub fn new(peer: &str, scheme: PeerScheme, prefix: &str, action: DeliveryAction) -> Self {
        let url = format!(
            "{}://{}{}{}",
            scheme,
            peer,
            prefix.trim_end_matches('/'),
            action.path()
        );
        Self {
            peer: peer.to_string(),
            url,
            action,
        }
    }
}

/// Transport trait for delivering federation requests to peers.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Perform a single delivery attempt.
    ///
    /// Succeeds only if the peer answered with a 2xx status.
    async fn deliver(&self, request: &DeliveryRequest) -> Result<(), DeliveryError>;
}

//! JSON bodies exchanged by federation relays.
//!
//! [`PostPayload`] is the only message that crosses instance boundaries with
//! content in it; deletes carry the origin post id in the URL path.

use serde::{Deserialize, Serialize};

use crate::{PeerScheme, TypesError};

/// A post as broadcast to peers.
///
/// Sent by a relay's broadcaster to `POST /receive` on every peer, and by the
/// local API gateway to `POST /internal/federate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    /// Post body text
    pub content: String,
    /// Author's username on the origin instance
    pub username: String,
    /// Post id on the origin instance
    pub post_id: i64,
}

/// Request to broadcast a deletion, sent to `POST /internal/federate-delete`.
///
/// `post_id` is optional on the wire so a missing id can be rejected with a
/// clear error instead of a body parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePayload {
    /// Post id on this (the origin) instance
    #[serde(default)]
    pub post_id: Option<i64>,
}

/// Peer registry request body for `POST /peers` and `DELETE /peers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerPayload {
    /// Peer network address, optionally with port
    pub hostname: String,
    /// Explicit transport scheme (inferred from the hostname when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<PeerScheme>,
}

impl PeerPayload {
    /// Create a payload without an explicit scheme.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            scheme: None,
        }
    }

    /// The hostname with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::EmptyHostname`] if nothing is left after trimming.
    pub fn normalized_hostname(&self) -> Result<&str, TypesError> {
        let hostname = self.hostname.trim();
        if hostname.is_empty() {
            return Err(TypesError::EmptyHostname);
        }
        Ok(hostname)
    }
}

/// Response body for `GET /peers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerList {
    /// Registered peer hostnames
    pub peers: Vec<String>,
}

/// Generic acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Human-readable status
    pub message: String,
}

impl Ack {
    /// Create an acknowledgement with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Rejection body returned with non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Reason for the rejection
    pub detail: String,
}

/// A received federated post, as listed by `GET /federated-posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedPostView {
    /// Local surrogate id
    pub id: i64,
    /// Post id on the origin instance
    pub origin_post_id: i64,
    /// Author's username on the origin instance
    pub username: String,
    /// Origin instance as attributed on receipt
    pub instance: String,
    /// Post body text
    pub content: String,
    /// Unix timestamp (seconds) when the post was received
    pub received_at: i64,
}

/// Response body for `GET /federated-posts`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedPostList {
    /// Posts, newest first
    pub posts: Vec<FederatedPostView>,
}

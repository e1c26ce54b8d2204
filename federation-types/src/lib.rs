//! # federation-types
//!
//! Wire format types for the DeBlog federation protocol.
//!
//! These are the JSON bodies exchanged between federation relays and between
//! a relay and its own API gateway:
//! - [`PostPayload`], [`DeletePayload`] - Federated content and delete triggers
//! - [`PeerPayload`], [`PeerList`] - Peer registry requests and responses
//! - [`Ack`], [`ErrorBody`] - Acknowledgement and rejection bodies
//! - [`PeerScheme`] - Transport scheme used to address a peer
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod messages;
mod scheme;

pub use error::TypesError;
pub use messages::{
    Ack, DeletePayload, ErrorBody, FederatedPostList, FederatedPostView, PeerList, PeerPayload,
    PostPayload,
};
pub use scheme::PeerScheme;

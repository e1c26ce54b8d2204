//! # federation-relay
//!
//! Peer-to-peer federation relay for DeBlog instances.
//!
//! This crate implements a relay that:
//! - Keeps a durable registry of peer instances
//! - Broadcasts locally-created posts and deletions to every peer but itself
//! - Records posts pushed by peers, attributed to their origin
//! - Removes recorded posts when their origin sends a delete
//!
//! ## Architecture
//!
//! ```text
//!  API gateway                                   Peer instance
//!      │ POST /internal/federate                      ▲
//!      ▼                                              │ POST /api/federation/receive
//! ┌──────────────────────────────────────────────┐    │
//! │              federation-relay                │────┘
//! │  Broadcaster ──► PeerRegistry                │
//! │  InboundReceiver ──► federated_posts         │◄──── POST /receive
//! │          SQLite (peers, federated_posts)     │      DELETE /posts/{id}
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery semantics
//!
//! Broadcast is best-effort: one attempt per peer per call, concurrent, each
//! bounded by a timeout. Peer failures are logged and never reach the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod broadcaster;
pub mod config;
pub mod error;
pub mod http;
pub mod receiver;
pub mod registry;
pub mod server;
pub mod storage;
pub mod transport;

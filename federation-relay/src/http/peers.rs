//! Peer registry endpoints.

use super::extract::JsonBody;
use crate::error::RelayError;
use crate::server::FederationRelay;
use axum::{Extension, Json};
use federation_types::{Ack, PeerList, PeerPayload};
use std::sync::Arc;

/// `POST /peers`: register a peer.
pub async fn add_peer(
    Extension(relay): Extension<Arc<FederationRelay>>,
    JsonBody(peer): JsonBody<PeerPayload>,
) -> Result<Json<Ack>, RelayError> {
    relay.registry().add_peer(&peer).await?;
    Ok(Json(Ack::new(format!("Peer {} added.", peer.hostname.trim()))))
}

/// `GET /peers`: list registered hostnames.
pub async fn list_peers(
    Extension(relay): Extension<Arc<FederationRelay>>,
) -> Result<Json<PeerList>, RelayError> {
    let peers = relay.registry().list_peers().await?;
    Ok(Json(PeerList {
        peers: peers.into_iter().map(|peer| peer.hostname).collect(),
    }))
}

/// `DELETE /peers`: remove a peer.
pub async fn remove_peer(
    Extension(relay): Extension<Arc<FederationRelay>>,
    JsonBody(peer): JsonBody<PeerPayload>,
) -> Result<Json<Ack>, RelayError> {
    relay.registry().remove_peer(&peer).await?;
    Ok(Json(Ack::new(format!("Peer {} deleted.", peer.hostname.trim()))))
}

//! Federation endpoints: inbound receipt from peers and the internal
//! broadcast triggers used by the local API gateway.

use super::extract::{JsonBody, PathParam};
use crate::broadcaster::BroadcastOutcome;
use crate::error::RelayError;
use crate::receiver::sender_identity;
use crate::server::FederationRelay;
use axum::extract::{ConnectInfo, Query};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use federation_types::{Ack, DeletePayload, FederatedPostList, FederatedPostView, PostPayload};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Default number of posts returned by `GET /federated-posts`.
const DEFAULT_LIST_LIMIT: u32 = 100;
/// Upper bound on `limit` for `GET /federated-posts`.
const MAX_LIST_LIMIT: u32 = 1000;

/// `POST /receive`: a peer pushes a post.
pub async fn receive_post(
    Extension(relay): Extension<Arc<FederationRelay>>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    JsonBody(payload): JsonBody<PostPayload>,
) -> Result<Json<Ack>, RelayError> {
    let sender = sender_identity(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    relay.receiver().receive_post(payload, &sender).await?;

    Ok(Json(Ack::new("Post received successfully")))
}

/// `DELETE /posts/{post_id}`: a peer pushes a delete.
pub async fn receive_delete(
    Extension(relay): Extension<Arc<FederationRelay>>,
    PathParam(post_id): PathParam<i64>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<Ack>, RelayError> {
    let sender = sender_identity(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    relay.receiver().receive_delete(post_id, &sender).await?;

    Ok(Json(Ack::new("Federated post deletion acknowledged.")))
}

/// `POST /internal/federate`: broadcast a local post.
pub async fn federate_post(
    Extension(relay): Extension<Arc<FederationRelay>>,
    JsonBody(payload): JsonBody<PostPayload>,
) -> Result<Json<Ack>, RelayError> {
    let outcome = relay.broadcaster().broadcast_post(&payload).await?;

    Ok(Json(match outcome {
        BroadcastOutcome::Skipped => {
            Ack::new("Federation skipped, INSTANCE_HOSTNAME not configured.")
        }
        BroadcastOutcome::Dispatched { .. } => Ack::new("Federation process initiated"),
    }))
}

/// `POST /internal/federate-delete`: broadcast a local deletion.
pub async fn federate_delete(
    Extension(relay): Extension<Arc<FederationRelay>>,
    JsonBody(payload): JsonBody<DeletePayload>,
) -> Result<Json<Ack>, RelayError> {
    let outcome = relay.broadcaster().broadcast_delete(payload.post_id).await?;

    Ok(Json(match outcome {
        BroadcastOutcome::Skipped => {
            Ack::new("Federation skipped, INSTANCE_HOSTNAME not configured.")
        }
        BroadcastOutcome::Dispatched { .. } => Ack::new("Federated delete process initiated"),
    }))
}

/// Query parameters for `GET /federated-posts`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    limit: Option<u32>,
}

/// `GET /federated-posts`: received posts, newest first.
pub async fn list_posts(
    Extension(relay): Extension<Arc<FederationRelay>>,
    Query(params): Query<ListParams>,
) -> Result<Json<FederatedPostList>, RelayError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    let posts = relay.receiver().list_posts(limit).await?;

    Ok(Json(FederatedPostList {
        posts: posts.into_iter().map(FederatedPostView::from).collect(),
    }))
}

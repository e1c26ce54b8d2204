//! HTTP endpoints for federation-relay.
//!
//! Peer-facing federation endpoints, internal broadcast triggers for the
//! local API gateway, the peer registry, and health/metrics.

mod extract;
mod federation;
pub mod health;
mod metrics;
mod peers;

use crate::error::{RelayError, StorageError};
use crate::server::FederationRelay;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use federation_types::ErrorBody;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<FederationRelay>) -> Router {
    let mut router = Router::new()
        .route("/receive", post(federation::receive_post))
        .route("/posts/:post_id", delete(federation::receive_delete))
        .route("/internal/federate", post(federation::federate_post))
        .route("/internal/federate-delete", post(federation::federate_delete))
        .route("/federated-posts", get(federation::list_posts))
        .route(
            "/peers",
            get(peers::list_peers)
                .post(peers::add_peer)
                .delete(peers::remove_peer),
        )
        .route("/health", get(health::health_handler));

    if relay.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router.layer(Extension(relay))
}

/// Serve the router on `listener` until `shutdown` resolves.
///
/// Accept-loop failures surface as [`RelayError::Io`].
///
/// Connection info is attached to every request so the receiver can fall
/// back to the direct peer address.
pub async fn serve<F>(
    listener: TcpListener,
    relay: Arc<FederationRelay>,
    shutdown: F,
) -> Result<(), RelayError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(relay);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    Ok(())
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            RelayError::Storage(StorageError::Conflict { .. }) => {
                (StatusCode::CONFLICT, "Peer already exists".to_string())
            }
            RelayError::Storage(StorageError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "Peer not found".to_string())
            }
            RelayError::InvalidArgument { reason } => (StatusCode::BAD_REQUEST, reason.clone()),
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::{PeerStorage, PostStorage, SqliteStorage};
    use crate::transport::MockTransport;
    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header::CONTENT_TYPE, Method, Request};
    use federation_types::{Ack, FederatedPostList, PeerList};
    use serde::de::DeserializeOwned;
    use tower::util::ServiceExt;

    struct TestApp {
        relay: Arc<FederationRelay>,
        mock: MockTransport,
    }

    impl TestApp {
        async fn new(own_hostname: Option<&str>) -> Self {
            let mut config = Config::default();
            config.federation.instance_hostname = own_hostname.map(str::to_string);

            let storage = SqliteStorage::in_memory().await.unwrap();
            let mock = MockTransport::new();
            let relay = Arc::new(FederationRelay::with_transport(
                config,
                storage,
                Arc::new(mock.clone()),
            ));
            Self { relay, mock }
        }

        fn router(&self) -> Router {
            build_router(self.relay.clone())
                .layer(MockConnectInfo(SocketAddr::from(([10, 9, 8, 7], 50000))))
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router().oneshot(request).await.unwrap()
        }
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = TestApp::new(None).await;

        let response = app
            .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_ok() {
        let app = TestApp::new(None).await;

        let response = app
            .send(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_can_be_disabled() {
        let mut config = Config::default();
        config.http.metrics_enabled = false;
        let storage = SqliteStorage::in_memory().await.unwrap();
        let relay = Arc::new(FederationRelay::with_transport(
            config,
            storage,
            Arc::new(MockTransport::new()),
        ));

        let response = build_router(relay)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn peer_registry_lifecycle() {
        let app = TestApp::new(None).await;
        let peer = serde_json::json!({"hostname": "b.example.com"});

        let response = app.send(json_request(Method::POST, "/peers", peer.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.send(json_request(Method::POST, "/peers", peer.clone())).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .send(Request::builder().uri("/peers").body(Body::empty()).unwrap())
            .await;
        let list: PeerList = read_json(response).await;
        assert_eq!(list.peers, vec!["b.example.com"]);

        let response = app.send(json_request(Method::DELETE, "/peers", peer.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.send(json_request(Method::DELETE, "/peers", peer)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_peer_hostname_is_bad_request() {
        let app = TestApp::new(None).await;

        let response = app
            .send(json_request(
                Method::POST,
                "/peers",
                serde_json::json!({"hostname": " "}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn receive_attributes_forwarded_sender() {
        let app = TestApp::new(None).await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/receive")
            .header(CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "b.example.com, 172.18.0.1")
            .body(Body::from(
                serde_json::json!({"content": "hi", "username": "alice", "post_id": 1})
                    .to_string(),
            ))
            .unwrap();
        let response = app.send(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let ack: Ack = read_json(response).await;
        assert_eq!(ack.message, "Post received successfully");
        assert_eq!(
            app.relay.storage().count_posts(1, "b.example.com").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn receive_falls_back_to_connection_address() {
        let app = TestApp::new(None).await;

        let response = app
            .send(json_request(
                Method::POST,
                "/receive",
                serde_json::json!({"content": "hi", "username": "alice", "post_id": 2}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            app.relay.storage().count_posts(2, "10.9.8.7").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn delete_only_removes_senders_post() {
        let app = TestApp::new(None).await;
        app.relay
            .receiver()
            .receive_post(
                federation_types::PostPayload {
                    content: "hi".into(),
                    username: "alice".into(),
                    post_id: 4,
                },
                "b.example.com",
            )
            .await
            .unwrap();

        // From the connection address: no match, still 200
        let response = app
            .send(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/posts/4")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            app.relay.storage().count_posts(4, "b.example.com").await.unwrap(),
            1
        );

        // From the origin
        let response = app
            .send(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/posts/4")
                    .header("x-forwarded-for", "b.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            app.relay.storage().count_posts(4, "b.example.com").await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn federate_skips_without_hostname() {
        let app = TestApp::new(None).await;
        app.relay.storage().insert_peer("b.example.com", None).await.unwrap();

        let response = app
            .send(json_request(
                Method::POST,
                "/internal/federate",
                serde_json::json!({"content": "hi", "username": "alice", "post_id": 1}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let ack: Ack = read_json(response).await;
        assert!(ack.message.contains("skipped"));
        assert!(app.mock.attempted().is_empty());
    }

    #[tokio::test]
    async fn federate_dispatches_to_peers() {
        let app = TestApp::new(Some("a.example.com")).await;
        app.relay.storage().insert_peer("a.example.com", None).await.unwrap();
        app.relay.storage().insert_peer("b.example.com", None).await.unwrap();

        let response = app
            .send(json_request(
                Method::POST,
                "/internal/federate",
                serde_json::json!({"content": "hi", "username": "alice", "post_id": 1}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let ack: Ack = read_json(response).await;
        assert_eq!(ack.message, "Federation process initiated");
        assert_eq!(app.mock.delivered_peers(), vec!["b.example.com"]);
    }

    #[tokio::test]
    async fn federate_succeeds_even_if_every_peer_fails() {
        let app = TestApp::new(Some("a.example.com")).await;
        app.relay.storage().insert_peer("b.example.com", None).await.unwrap();
        app.mock.fail_peer(
            "b.example.com",
            crate::transport::DeliveryError::Request("connection refused".into()),
        );

        let response = app
            .send(json_request(
                Method::POST,
                "/internal/federate-delete",
                serde_json::json!({"post_id": 3}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.mock.attempted().len(), 1);
    }

    #[tokio::test]
    async fn federate_delete_requires_post_id() {
        let app = TestApp::new(Some("a.example.com")).await;
        app.relay.storage().insert_peer("b.example.com", None).await.unwrap();

        let response = app
            .send(json_request(
                Method::POST,
                "/internal/federate-delete",
                serde_json::json!({}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = read_json(response).await;
        assert_eq!(body.detail, "post_id is required");
        assert!(app.mock.attempted().is_empty());
    }

    #[tokio::test]
    async fn federate_delete_rejects_mistyped_post_id() {
        let app = TestApp::new(Some("a.example.com")).await;
        app.relay.storage().insert_peer("b.example.com", None).await.unwrap();

        let response = app
            .send(json_request(
                Method::POST,
                "/internal/federate-delete",
                serde_json::json!({"post_id": "abc"}),
            ))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = read_json(response).await;
        assert!(!body.detail.is_empty());
        assert!(app.mock.attempted().is_empty());
    }

    #[tokio::test]
    async fn federate_delete_without_body_is_bad_request() {
        let app = TestApp::new(Some("a.example.com")).await;
        app.relay.storage().insert_peer("b.example.com", None).await.unwrap();

        let response = app
            .send(
                Request::builder()
                    .method(Method::POST)
                    .uri("/internal/federate-delete")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = read_json(response).await;
        assert!(body.detail.contains("Content-Type"));
        assert!(app.mock.attempted().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_post_id_in_path_is_bad_request() {
        let app = TestApp::new(None).await;

        let response = app
            .send(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/posts/abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = read_json(response).await;
        assert!(body.detail.contains("abc"));
    }

    #[tokio::test]
    async fn peer_without_hostname_is_bad_request() {
        let app = TestApp::new(None).await;

        let response = app
            .send(json_request(Method::POST, "/peers", serde_json::json!({})))
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = read_json(response).await;
        assert!(body.detail.contains("hostname"));
        assert_eq!(app.relay.storage().peer_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn federated_posts_are_listed() {
        let app = TestApp::new(None).await;
        app.relay
            .storage()
            .insert_post(crate::storage::StorePostRequest {
                origin_post_id: 8,
                origin_username: "carol".into(),
                origin_hostname: "c.example.com".into(),
                content: "remote".into(),
            })
            .await
            .unwrap();

        let response = app
            .send(
                Request::builder()
                    .uri("/federated-posts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let list: FederatedPostList = read_json(response).await;
        assert_eq!(list.posts.len(), 1);
        assert_eq!(list.posts[0].username, "carol");
        assert_eq!(list.posts[0].instance, "c.example.com");
    }
}

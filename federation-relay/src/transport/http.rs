//! HTTP transport backed by reqwest.

use super::{DeliveryAction, DeliveryError, DeliveryRequest, PeerTransport};
use crate::config::FederationConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Header that tells public tunnels to skip their browser interstitial.
const TUNNEL_WARNING_BYPASS: &str = "ngrok-skip-browser-warning";

/// Delivers federation requests over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Build a client with the identifying headers and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised or the
    /// configured user agent is not a valid header value.
    pub fn new(config: &FederationConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(TUNNEL_WARNING_BYPASS),
            HeaderValue::from_static("true"),
        );

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http })
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DeliveryError::Timeout
        } else {
            DeliveryError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl PeerTransport for HttpTransport {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<(), DeliveryError> {
        let builder = match &request.action {
            DeliveryAction::Post(payload) => self.http.post(&request.url).json(payload),
            DeliveryAction::Delete { .. } => self.http.delete(&request.url),
        };

        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use federation_types::PeerScheme;

    #[test]
    fn builds_with_default_config() {
        let transport = HttpTransport::new(&FederationConfig::default());
        assert!(transport.is_ok());
    }

    #[tokio::test]
    async fn sends_identifying_headers_and_maps_error_status() {
        use axum::http::{HeaderMap as ReceivedHeaders, StatusCode};
        use axum::routing::post;
        use axum::Router;
        use std::sync::{Arc, Mutex};

        let seen: Arc<Mutex<Option<ReceivedHeaders>>> = Arc::default();
        let recorder = seen.clone();
        let app = Router::new().route(
            "/receive",
            post(move |headers: ReceivedHeaders| {
                *recorder.lock().unwrap() = Some(headers);
                async { StatusCode::INTERNAL_SERVER_ERROR }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let transport = HttpTransport::new(&FederationConfig::default()).unwrap();
        let request = DeliveryRequest::new(
            &addr.to_string(),
            PeerScheme::Http,
            "",
            DeliveryAction::Post(federation_types::PostPayload {
                content: "hi".into(),
                username: "alice".into(),
                post_id: 1,
            }),
        );

        let result = transport.deliver(&request).await;
        assert!(matches!(result, Err(DeliveryError::Status(500))));

        let headers = seen.lock().unwrap().take().unwrap();
        assert_eq!(
            headers.get("user-agent").unwrap(),
            "DeBlogFederationService/1.0"
        );
        assert_eq!(headers.get(TUNNEL_WARNING_BYPASS).unwrap(), "true");
    }

    #[tokio::test]
    async fn unreachable_peer_is_request_error() {
        let transport = HttpTransport::new(&FederationConfig::default()).unwrap();
        // Port 1 on loopback refuses connections
        let request = DeliveryRequest::new(
            "127.0.0.1:1",
            PeerScheme::Http,
            "",
            DeliveryAction::Delete { post_id: 1 },
        );

        let err = transport.deliver(&request).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Request(_)));
    }
}

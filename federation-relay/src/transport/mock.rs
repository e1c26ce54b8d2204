//! Mock transport for testing.
//!
//! Records every delivery attempt and lets tests make individual peers fail
//! or stall.

use super::{DeliveryError, DeliveryRequest, PeerTransport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle and give another to
/// the broadcaster.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    attempted: Vec<DeliveryRequest>,
    delivered: Vec<DeliveryRequest>,
    failures: HashMap<String, DeliveryError>,
    delays: HashMap<String, Duration>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request passed to `deliver()`, in call order.
    pub fn attempted(&self) -> Vec<DeliveryRequest> {
        let inner = self.inner.lock().unwrap();
        inner.attempted.clone()
    }

    /// Requests that completed successfully.
    pub fn delivered(&self) -> Vec<DeliveryRequest> {
        let inner = self.inner.lock().unwrap();
        inner.delivered.clone()
    }

    /// Hostnames of peers that received a successful delivery, sorted.
    pub fn delivered_peers(&self) -> Vec<String> {
        let mut peers: Vec<String> = self.delivered().into_iter().map(|r| r.peer).collect();
        peers.sort();
        peers
    }

    /// Make every delivery to `peer` fail with `error`.
    pub fn fail_peer(&self, peer: &str, error: DeliveryError) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures.insert(peer.to_string(), error);
    }

    /// Make every delivery to `peer` stall for `delay` before completing.
    pub fn delay_peer(&self, peer: &str, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.delays.insert(peer.to_string(), delay);
    }

    /// Clear all state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<(), DeliveryError> {
        let (delay, failure) = {
            let mut inner = self.inner.lock().unwrap();
            inner.attempted.push(request.clone());
            (
                inner.delays.get(&request.peer).copied(),
                inner.failures.get(&request.peer).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = failure {
            return Err(error);
        }

        let mut inner = self.inner.lock().unwrap();
        inner.delivered.push(request.clone());
        Ok(())
    }
}

//! Transport scheme selection for peers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// URL scheme used to reach a peer.
///
/// Peers on the local network speak plain HTTP; peers exposed through a
/// public tunnel are only reachable over HTTPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerScheme {
    /// Plain `http://`
    Http,
    /// TLS `https://`
    Https,
}

impl PeerScheme {
    /// Infer the scheme for a hostname that has no explicit scheme recorded.
    ///
    /// Hostnames containing any of `tunnel_domains` are addressed over HTTPS,
    /// everything else over HTTP.
    pub fn infer<S: AsRef<str>>(hostname: &str, tunnel_domains: &[S]) -> Self {
        if tunnel_domains
            .iter()
            .map(AsRef::as_ref)
            .any(|domain| !domain.is_empty() && hostname.contains(domain))
        {
            PeerScheme::Https
        } else {
            PeerScheme::Http
        }
    }

    /// The scheme as it appears in a URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerScheme::Http => "http",
            PeerScheme::Https => "https",
        }
    }
}

impl fmt::Display for PeerScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeerScheme {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(PeerScheme::Http),
            "https" => Ok(PeerScheme::Https),
            other => Err(TypesError::UnknownScheme(other.to_string())),
        }
    }
}

//! Configuration loading for federation-relay.
//!
//! Configuration is loaded from a TOML file (default: `federation.toml`),
//! then a small set of environment variables is applied on top once at
//! startup. After that the configuration is immutable.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "federation.toml";

/// Environment variable naming this instance's own hostname.
pub const ENV_INSTANCE_HOSTNAME: &str = "INSTANCE_HOSTNAME";
/// Environment variable overriding the database path.
pub const ENV_DATABASE: &str = "FEDERATION_DATABASE";
/// Environment variable overriding the HTTP bind address.
pub const ENV_BIND_ADDRESS: &str = "FEDERATION_BIND_ADDRESS";

/// Root configuration for federation-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Federation (outbound broadcast) configuration.
    #[serde(default)]
    pub federation: FederationConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP server (default: 0.0.0.0:5001).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database file.
    #[serde(default = "default_database_path")]
    pub database: PathBuf,
    /// Maximum pooled connections (default: 10).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// This instance's own hostname as peers know it.
    ///
    /// When unset, broadcasts are skipped entirely.
    #[serde(default)]
    pub instance_hostname: Option<String>,
    /// Per-peer delivery timeout in seconds (default: 5).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Path prefix under which peers expose their federation endpoints
    /// (default: `/api/federation`, the API gateway mount point).
    #[serde(default = "default_peer_path_prefix")]
    pub peer_path_prefix: String,
    /// Hostname fragments identifying publicly tunnelled peers, which are
    /// addressed over HTTPS when no explicit scheme is registered.
    #[serde(default = "default_tunnel_domains")]
    pub tunnel_domains: Vec<String>,
    /// User-Agent sent with every outbound request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:5001".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("federation.db")
}

fn default_max_connections() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_peer_path_prefix() -> String {
    "/api/federation".to_string()
}

fn default_tunnel_domains() -> Vec<String> {
    vec!["ngrok-free.app".to_string()]
}

fn default_user_agent() -> String {
    "DeBlogFederationService/1.0".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            instance_hostname: None,
            request_timeout_secs: default_request_timeout_secs(),
            peer_path_prefix: default_peer_path_prefix(),
            tunnel_domains: default_tunnel_domains(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl FederationConfig {
    /// Own hostname, treating an empty value as unset.
    pub fn own_hostname(&self) -> Option<&str> {
        self.instance_hostname
            .as_deref()
            .filter(|hostname| !hostname.trim().is_empty())
    }

    /// Per-peer delivery timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load configuration from `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!("No config file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` to resolve variable names.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(hostname) = lookup(ENV_INSTANCE_HOSTNAME) {
            self.federation.instance_hostname = Some(hostname);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.storage.database = PathBuf::from(database);
        }
        if let Some(bind) = lookup(ENV_BIND_ADDRESS) {
            self.server.bind_address = bind;
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:5001");
        assert_eq!(config.storage.database, PathBuf::from("federation.db"));
        assert_eq!(config.federation.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.federation.peer_path_prefix, "/api/federation");
        assert_eq!(config.federation.tunnel_domains, vec!["ngrok-free.app"]);
        assert!(config.federation.own_hostname().is_none());
        assert!(config.http.metrics_enabled);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_address = "127.0.0.1:6000"

[storage]
database = "/data/federation.db"

[federation]
instance_hostname = "a.example.com"
request_timeout_secs = 2
tunnel_domains = ["ngrok-free.app", "trycloudflare.com"]

[http]
metrics_enabled = false
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:6000");
        assert_eq!(config.storage.database, PathBuf::from("/data/federation.db"));
        assert_eq!(config.federation.own_hostname(), Some("a.example.com"));
        assert_eq!(config.federation.request_timeout_secs, 2);
        assert_eq!(config.federation.tunnel_domains.len(), 2);
        assert!(!config.http.metrics_enabled);
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.max_connections, 10);
        assert_eq!(config.federation.user_agent, "DeBlogFederationService/1.0");
    }

    #[test]
    fn empty_instance_hostname_is_unset() {
        let toml = r#"
[federation]
instance_hostname = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.federation.own_hostname().is_none());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_INSTANCE_HOSTNAME, "b.example.com"),
            (ENV_DATABASE, "/tmp/override.db"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.federation.own_hostname(), Some("b.example.com"));
        assert_eq!(config.storage.database, PathBuf::from("/tmp/override.db"));
        // Untouched
        assert_eq!(config.server.bind_address, "0.0.0.0:5001");
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[federation]\ninstance_hostname = \"c.example.com\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.federation.own_hostname(), Some("c.example.com"));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[federation\nbroken").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:5001");
    }
}

//! Error types for federation-relay.

use federation_types::TypesError;

/// Main error type for federation-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Request is missing a required value or carries an invalid one.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the request.
        reason: String,
    },

    /// Outbound HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// I/O error while serving HTTP.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// Shorthand for [`RelayError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        RelayError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<TypesError> for RelayError {
    fn from(err: TypesError) -> Self {
        RelayError::invalid_argument(err.to_string())
    }
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Peer hostname is already registered.
    #[error("peer already exists: {hostname}")]
    Conflict {
        /// The duplicate hostname.
        hostname: String,
    },

    /// Peer hostname is not registered.
    #[error("peer not found: {hostname}")]
    NotFound {
        /// The hostname that was not found.
        hostname: String,
    },
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

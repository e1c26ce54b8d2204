//! Error types for DeBlog federation payloads.

use thiserror::Error;

/// Errors that can occur while interpreting federation wire values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    /// Unknown transport scheme
    #[error("unknown peer scheme: {0}")]
    UnknownScheme(String),

    /// Hostname is empty after trimming
    #[error("hostname must not be empty")]
    EmptyHostname,
}

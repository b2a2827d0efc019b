//! Error types for node stores.

use std::path::PathBuf;
use std::time::Duration;

use crate::key::ObjectKey;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors a node store (local or remote) can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object does not exist on this node.
    #[error("object {0} not found")]
    NotFound(ObjectKey),

    /// A key or composite key string failed validation.
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    /// Local filesystem failure.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote node could not be reached or the connection broke.
    #[error("node {address} unreachable: {reason}")]
    Unreachable { address: String, reason: String },

    /// The remote node did not answer within the deadline.
    #[error("node {address} timed out after {after:?}")]
    Timeout { address: String, after: Duration },

    /// The remote node answered with something the caller cannot use.
    #[error("node {address} failed: {message}")]
    Remote { address: String, message: String },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for transport-level failures (unreachable or timed out peer).
    pub fn is_unreachable(&self) -> bool {
        matches!(self, StoreError::Unreachable { .. } | StoreError::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

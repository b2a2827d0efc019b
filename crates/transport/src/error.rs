//! Transport errors.

use std::io;
use std::time::Duration;

use store::StoreError;

use crate::protocol::{ErrorKind, RemoteError};

/// Errors raised while talking to a peer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// TCP connect failed or timed out.
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The connection broke mid-request.
    #[error("i/o with {address} failed: {source}")]
    Io {
        address: String,
        #[source]
        source: io::Error,
    },

    /// No response within the request deadline.
    #[error("{address} did not answer within {after:?}")]
    Timeout { address: String, after: Duration },

    /// The connection was closed by [`Connection::close`](crate::Connection::close).
    #[error("connection to {address} is closed")]
    Closed { address: String },

    /// The peer answered with an error.
    #[error("{address} replied {error}")]
    Remote { address: String, error: RemoteError },

    /// The peer answered with a response of the wrong shape.
    #[error("{address} sent an unexpected response")]
    UnexpectedResponse { address: String },
}

impl TransportError {
    /// The remote error kind, if the peer answered with one.
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            TransportError::Remote { error, .. } => Some(error.kind),
            _ => None,
        }
    }
}

impl From<TransportError> for StoreError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Connect { address, source } | TransportError::Io { address, source } => {
                StoreError::Unreachable {
                    address,
                    reason: source.to_string(),
                }
            }
            TransportError::Closed { address } => StoreError::Unreachable {
                address,
                reason: "connection closed".to_string(),
            },
            TransportError::Timeout { address, after } => StoreError::Timeout { address, after },
            TransportError::Remote { address, error } => match error.kind {
                ErrorKind::InvalidKey => StoreError::InvalidKey(error.message),
                _ => StoreError::Remote {
                    address,
                    message: error.to_string(),
                },
            },
            TransportError::UnexpectedResponse { address } => StoreError::Remote {
                message: format!("{address} sent an unexpected response"),
                address,
            },
        }
    }
}

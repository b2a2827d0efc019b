//! Cluster errors.

use corelib::{HashToken, RingError};
use store::{ObjectKey, StoreError};
use transport::ErrorKind;

pub type Result<T> = std::result::Result<T, ClusterError>;

/// Errors surfaced by the router and the membership controller.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// No storage node is a member; nothing can be routed.
    #[error("ring is empty")]
    EmptyRing,

    /// The owning (or departing, or successor) node could not be reached.
    #[error("node {address} unreachable: {source}")]
    NodeUnreachable {
        address: String,
        #[source]
        source: StoreError,
    },

    #[error("object {0} not found")]
    NotFound(ObjectKey),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("node {0} is not a member")]
    NodeNotFound(String),

    /// The address hashes onto a token another member already holds.
    #[error("node {address} hashes to {token}, already held by {existing}")]
    DuplicateHash {
        address: String,
        token: HashToken,
        existing: String,
    },

    /// The joining node refused the connection; the ring is unchanged.
    #[error("new node {address} unreachable: {source}")]
    UnreachableNewNode {
        address: String,
        #[source]
        source: StoreError,
    },

    /// Any other failure reported by a node store.
    #[error("node {address} failed: {source}")]
    Store {
        address: String,
        #[source]
        source: StoreError,
    },
}

impl ClusterError {
    /// Classifies a store error raised by the node at `address`.
    pub fn from_store(address: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => ClusterError::NotFound(key),
            StoreError::InvalidKey(reason) => ClusterError::InvalidKey(reason),
            err if err.is_unreachable() => ClusterError::NodeUnreachable {
                address: address.to_string(),
                source: err,
            },
            err => ClusterError::Store {
                address: address.to_string(),
                source: err,
            },
        }
    }

    /// Wire tag for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClusterError::EmptyRing => ErrorKind::EmptyRing,
            ClusterError::NodeUnreachable { .. } => ErrorKind::NodeUnreachable,
            ClusterError::NotFound(_) => ErrorKind::NotFound,
            ClusterError::InvalidKey(_) => ErrorKind::InvalidKey,
            ClusterError::NodeNotFound(_) => ErrorKind::NodeNotFound,
            ClusterError::DuplicateHash { .. } => ErrorKind::DuplicateHash,
            ClusterError::UnreachableNewNode { .. } => ErrorKind::UnreachableNewNode,
            ClusterError::Store { .. } => ErrorKind::Internal,
        }
    }
}

impl From<RingError> for ClusterError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::EmptyRing => ClusterError::EmptyRing,
            RingError::DuplicateHash {
                address,
                token,
                existing,
            } => ClusterError::DuplicateHash {
                address,
                token,
                existing,
            },
            RingError::NodeNotFound(address) => ClusterError::NodeNotFound(address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_store_errors_keep_their_category() {
        let key = ObjectKey::new("v1", "init.mp4").unwrap();
        let err = ClusterError::from_store("n1:8090", StoreError::NotFound(key.clone()));
        assert!(matches!(err, ClusterError::NotFound(ref k) if *k == key));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ClusterError::from_store(
            "n1:8090",
            StoreError::Timeout {
                address: "n1:8090".into(),
                after: Duration::from_secs(1),
            },
        );
        assert_eq!(err.kind(), ErrorKind::NodeUnreachable);

        let err = ClusterError::from_store(
            "n1:8090",
            StoreError::Remote {
                address: "n1:8090".into(),
                message: "disk full".into(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_ring_errors_convert() {
        assert!(matches!(ClusterError::from(RingError::EmptyRing), ClusterError::EmptyRing));
        let err = ClusterError::from(RingError::NodeNotFound("n9:8090".into()));
        assert_eq!(err.kind(), ErrorKind::NodeNotFound);
    }
}

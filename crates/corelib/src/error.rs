//! Error types for the core library.

use crate::token::HashToken;

/// Result type alias for ring operations.
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors that can occur when querying or mutating the ring.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// No nodes are registered; nothing can own a key.
    #[error("ring is empty")]
    EmptyRing,

    /// A node with this hash is already a member.
    #[error("node {address} hashes to {token}, already held by {existing}")]
    DuplicateHash {
        address: String,
        token: HashToken,
        existing: String,
    },

    /// No member has this address.
    #[error("node {0} is not a ring member")]
    NodeNotFound(String),
}

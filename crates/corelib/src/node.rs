//! Node descriptors for the hash ring.
//!
//! A node's identity is its address; its token is derived from the address
//! by the ring's partitioner and cannot be set independently.

use std::fmt;

use crate::token::HashToken;

/// Ring member: address, derived token, and a shared handle to the remote
/// store behind it.
///
/// Lookups hand out clones of this descriptor, never references into the
/// live ring, so the handle type must be cheap to clone (an `Arc` or a unit
/// marker in tests).
#[derive(Clone, Debug)]
pub struct Node<H> {
    /// Network address, e.g. `localhost:8090`.
    pub address: String,
    /// Position on the ring.
    pub token: HashToken,
    /// Connection (or any other per-member state) shared by all users.
    pub handle: H,
}

impl<H> Node<H> {
    pub(crate) fn new(address: String, token: HashToken, handle: H) -> Self {
        Self {
            address,
            token,
            handle,
        }
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[inline]
    pub fn token(&self) -> HashToken {
        self.token
    }

    #[inline]
    pub fn handle(&self) -> &H {
        &self.handle
    }
}

impl<H> fmt::Display for Node<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.address, self.token)
    }
}

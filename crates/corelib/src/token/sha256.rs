//! SHA-256 derived token (the ring's coordinate space).
//!
//! A token is the first 8 bytes of the SHA-256 digest of a key, read
//! big-endian. Every member of a cluster must compute it the same way: it
//! decides which node owns an address or an object key.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::token::traits::Token;

/// Position on the ring, in `[0, 2^64)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct HashToken(pub u64);

impl Token for HashToken {
    const MIN: Self = HashToken(0);
    const MAX: Self = HashToken(u64::MAX);

    fn distance_to(&self, other: &Self) -> Self {
        HashToken(other.0.wrapping_sub(self.0))
    }
}

impl HashToken {
    /// Creates a token from a byte slice by truncating its SHA-256 digest.
    pub fn from_bytes(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        HashToken(u64::from_be_bytes(prefix))
    }

    /// Creates a token from a string key.
    pub fn from_key(key: &str) -> Self {
        Self::from_bytes(key.as_bytes())
    }

    /// Raw ring coordinate.
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HashToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for HashToken {
    fn from(value: u64) -> Self {
        HashToken(value)
    }
}

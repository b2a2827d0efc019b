//! SHA-256 partitioner implementation.

use crate::partitioner::traits::Partitioner;
use crate::token::HashToken;

/// Default partitioner: truncated SHA-256, big-endian.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Partitioner;

impl Partitioner for Sha256Partitioner {
    fn partition(&self, key: &[u8]) -> HashToken {
        HashToken::from_bytes(key)
    }

    fn name(&self) -> &'static str {
        "Sha256Partitioner"
    }
}

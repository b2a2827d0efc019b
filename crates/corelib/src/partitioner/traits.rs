//! Core partitioner trait definitions.

use std::fmt::Debug;

use crate::token::HashToken;

/// A partitioner converts keys into tokens for placement on the hash ring.
///
/// Partitioners are stateless and thread-safe, allowing concurrent
/// token generation without synchronization overhead. Every process that
/// shares a ring must use the same partitioner.
pub trait Partitioner: Send + Sync + Debug + 'static {
    /// Converts a key into a token.
    fn partition(&self, key: &[u8]) -> HashToken;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}

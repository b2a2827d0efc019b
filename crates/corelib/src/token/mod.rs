//! Token abstraction module for the hash ring.
//!
//! Tokens are positions in the ring's coordinate space. They must be
//! comparable, hashable, and thread-safe.

pub mod sha256;
pub mod traits;

pub use sha256::HashToken;
pub use traits::Token;

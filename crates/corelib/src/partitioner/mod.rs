//! Partitioner abstraction for the hash ring.
//!
//! Partitioners convert keys (node addresses, object keys) into tokens that
//! can be placed on the ring.

pub mod sha256;
pub mod table;
pub mod traits;

pub use sha256::Sha256Partitioner;
pub use table::TablePartitioner;
pub use traits::Partitioner;

//! Core library for the segment store's consistent hash ring.
//!
//! This crate provides the placement primitives shared by every process in a
//! cluster:
//! - The token type and the partitioner that hashes keys onto the ring
//! - Node descriptors
//! - The ring itself: ownership lookup, membership insert/remove, snapshots
//! - Read-only topology views for operators

pub mod error;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod token;
pub mod topology;

pub use error::{Result, RingError};
pub use node::Node;
pub use partitioner::{Partitioner, Sha256Partitioner, TablePartitioner};
pub use ring::{HashRing, OwnershipRange, Removal, RingBuilder};
pub use token::{HashToken, Token};
pub use topology::MemberInfo;

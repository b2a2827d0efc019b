//! Consistent hash ring implementation.
//!
//! The ring manages member positions and resolves which member owns a
//! token. Ownership is the half-open circular interval
//! `(predecessor, member]`; the smallest-token member also owns everything
//! past the largest token.

pub mod range;
pub mod ring;

pub use range::OwnershipRange;
pub use ring::{HashRing, Removal, RingBuilder};

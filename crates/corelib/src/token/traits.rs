//! Ring coordinate contract.

use std::fmt::Debug;
use std::hash::Hash;

/// A position on a circular coordinate space.
pub trait Token: Copy + Ord + Hash + Send + Sync + Debug + 'static {
    /// Smallest position; the ring wraps from [`MAX`](Self::MAX) back to it.
    const MIN: Self;
    const MAX: Self;

    /// Clockwise distance from `self` to `other`, wrapping.
    fn distance_to(&self, other: &Self) -> Self;
}

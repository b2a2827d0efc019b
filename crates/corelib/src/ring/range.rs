//! Ownership ranges on the circular token space.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::{HashToken, Token};

/// Half-open circular interval `(start, end]`.
///
/// When `start == end` the range covers the whole ring: that is the range
/// of the only member of a single-node ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipRange {
    /// Exclusive lower bound (the predecessor's token).
    pub start: HashToken,
    /// Inclusive upper bound (the owner's token).
    pub end: HashToken,
}

impl OwnershipRange {
    pub fn new(start: HashToken, end: HashToken) -> Self {
        Self { start, end }
    }

    /// True if `token` falls inside `(start, end]`, wrapping past the top of
    /// the token space when `start >= end`.
    #[inline]
    pub fn contains(&self, token: HashToken) -> bool {
        if self.start < self.end {
            self.start < token && token <= self.end
        } else {
            token > self.start || token <= self.end
        }
    }

    /// True if the range wraps past the maximum token.
    pub fn wraps(&self) -> bool {
        self.start >= self.end
    }

    /// Number of tokens covered, saturated to `u64::MAX` for the full ring.
    pub fn width(&self) -> u64 {
        if self.start == self.end {
            HashToken::MAX.value()
        } else {
            self.start.distance_to(&self.end).value()
        }
    }

    /// Share of the token space covered, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.start == self.end {
            1.0
        } else {
            self.width() as f64 / (u64::MAX as f64 + 1.0)
        }
    }
}

impl fmt::Display for OwnershipRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.start, self.end)
    }
}

//! Read-only views over the ring for operators.

use serde::{Deserialize, Serialize};

use crate::ring::{HashRing, OwnershipRange};
use crate::token::HashToken;

/// One member as reported to an operator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub address: String,
    pub token: HashToken,
    pub range: OwnershipRange,
    /// Share of the token space owned, in `[0, 1]`.
    pub share: f64,
}

/// Membership with ownership ranges, ascending by token.
pub fn describe<H: Clone>(ring: &HashRing<H>) -> Vec<MemberInfo> {
    ring.ownership()
        .into_iter()
        .map(|(node, range)| MemberInfo {
            address: node.address,
            token: node.token,
            range,
            share: range.fraction(),
        })
        .collect()
}

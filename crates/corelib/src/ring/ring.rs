//! Hash ring data structure.
//!
//! Holds a `BTreeMap<HashToken, Node<H>>` behind a single reader/writer lock.
//! The lock is only ever held for the in-memory lookup or splice; callers get
//! owned `Node` clones back and do their I/O with the lock released.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, RingError};
use crate::node::Node;
use crate::partitioner::{Partitioner, Sha256Partitioner};
use crate::ring::range::OwnershipRange;
use crate::token::HashToken;

/// Outcome of removing a member.
#[derive(Clone, Debug)]
pub struct Removal<H> {
    /// The evicted member.
    pub node: Node<H>,
    /// Its position in ascending token order before removal.
    pub index: usize,
    /// Member that inherits the evicted range, computed before removal.
    /// `None` when the ring is now empty.
    pub successor: Option<Node<H>>,
}

/// Membership set ordered by token.
///
/// # Invariants
///
/// - Tokens are unique (the map key).
/// - Either the ring is empty or every token has exactly one owner.
/// - Readers never observe a half-applied insert or remove.
#[derive(Debug)]
pub struct HashRing<H> {
    members: RwLock<BTreeMap<HashToken, Node<H>>>,
    partitioner: Arc<dyn Partitioner>,
}

impl<H: Clone> Default for HashRing<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> HashRing<H> {
    /// Empty ring using the SHA-256 partitioner.
    pub fn new() -> Self {
        Self::with_partitioner(Arc::new(Sha256Partitioner))
    }

    pub fn with_partitioner(partitioner: Arc<dyn Partitioner>) -> Self {
        Self {
            members: RwLock::new(BTreeMap::new()),
            partitioner,
        }
    }

    pub fn partitioner(&self) -> &Arc<dyn Partitioner> {
        &self.partitioner
    }

    /// Token of an arbitrary key (address or composite object key).
    #[inline]
    pub fn token_for(&self, key: &str) -> HashToken {
        self.partitioner.partition(key.as_bytes())
    }

    /// Builds a node descriptor whose token is derived from `address`.
    pub fn node(&self, address: impl Into<String>, handle: H) -> Node<H> {
        let address = address.into();
        let token = self.token_for(&address);
        Node::new(address, token, handle)
    }

    /// Member owning `token`: the first member whose token is `>= token`,
    /// wrapping to the smallest-token member.
    ///
    /// The comparison is inclusive on purpose. A key hashing exactly onto a
    /// member's token belongs to that member, matching the `(pred, member]`
    /// ranges from [`ownership`](Self::ownership). A strict `>` would hand it
    /// to the next member and break that partition.
    pub fn lookup(&self, token: HashToken) -> Result<Node<H>> {
        let members = self.members.read();
        owner_of(&members, token).cloned().ok_or(RingError::EmptyRing)
    }

    /// Member owning `key` after hashing it with the ring's partitioner.
    pub fn lookup_key(&self, key: &str) -> Result<Node<H>> {
        self.lookup(self.token_for(key))
    }

    /// Member that currently owns position `token`.
    ///
    /// Same resolution as [`lookup`](Self::lookup); used when reasoning about
    /// where a joining node will land.
    pub fn successor(&self, token: HashToken) -> Result<Node<H>> {
        self.lookup(token)
    }

    /// Last member strictly before `token`, wrapping to the largest-token
    /// member.
    pub fn predecessor(&self, token: HashToken) -> Result<Node<H>> {
        let members = self.members.read();
        members
            .range(..token)
            .next_back()
            .or_else(|| members.iter().next_back())
            .map(|(_, node)| node.clone())
            .ok_or(RingError::EmptyRing)
    }

    /// Next member after `address` in token order, wrapping. A single-member
    /// ring returns that member.
    pub fn successor_of(&self, address: &str) -> Result<Node<H>> {
        let members = self.members.read();
        let token = find_token(&members, address)?;
        next_after(&members, token)
            .cloned()
            .ok_or_else(|| RingError::NodeNotFound(address.to_string()))
    }

    /// Range currently owned by `address`.
    pub fn range_of(&self, address: &str) -> Result<OwnershipRange> {
        let members = self.members.read();
        let token = find_token(&members, address)?;
        let start = prev_before(&members, token).map_or(token, |prev| prev.token);
        Ok(OwnershipRange::new(start, token))
    }

    pub fn get(&self, address: &str) -> Option<Node<H>> {
        let members = self.members.read();
        members
            .values()
            .find(|node| node.address == address)
            .cloned()
    }

    /// Adds a member. Fails without mutating if its token is already taken.
    pub fn insert(&self, node: Node<H>) -> Result<()> {
        let mut members = self.members.write();
        if let Some(existing) = members.get(&node.token) {
            return Err(RingError::DuplicateHash {
                address: node.address,
                token: node.token,
                existing: existing.address.clone(),
            });
        }
        members.insert(node.token, node);
        Ok(())
    }

    /// Evicts the member with `address`, reporting who inherits its range.
    pub fn remove(&self, address: &str) -> Result<Removal<H>> {
        let mut members = self.members.write();
        let (index, token) = members
            .iter()
            .enumerate()
            .find(|(_, (_, node))| node.address == address)
            .map(|(index, (token, _))| (index, *token))
            .ok_or_else(|| RingError::NodeNotFound(address.to_string()))?;

        let successor = if members.len() > 1 {
            next_after(&members, token).cloned()
        } else {
            None
        };
        let node = members
            .remove(&token)
            .ok_or_else(|| RingError::NodeNotFound(address.to_string()))?;

        Ok(Removal {
            node,
            index,
            successor,
        })
    }

    /// Addresses in ascending token order, copied out of the ring.
    pub fn snapshot(&self) -> Vec<String> {
        let members = self.members.read();
        members.values().map(|node| node.address.clone()).collect()
    }

    /// Member descriptors in ascending token order.
    pub fn nodes(&self) -> Vec<Node<H>> {
        let members = self.members.read();
        members.values().cloned().collect()
    }

    /// Every member with the range it owns, in ascending token order.
    pub fn ownership(&self) -> Vec<(Node<H>, OwnershipRange)> {
        let members = self.members.read();
        members
            .values()
            .map(|node| {
                let start = prev_before(&members, node.token).map_or(node.token, |prev| prev.token);
                (node.clone(), OwnershipRange::new(start, node.token))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }
}

fn owner_of<H>(members: &BTreeMap<HashToken, Node<H>>, token: HashToken) -> Option<&Node<H>> {
    members
        .range(token..)
        .next()
        .or_else(|| members.iter().next())
        .map(|(_, node)| node)
}

fn find_token<H>(members: &BTreeMap<HashToken, Node<H>>, address: &str) -> Result<HashToken> {
    members
        .values()
        .find(|node| node.address == address)
        .map(|node| node.token)
        .ok_or_else(|| RingError::NodeNotFound(address.to_string()))
}

fn next_after<H>(members: &BTreeMap<HashToken, Node<H>>, token: HashToken) -> Option<&Node<H>> {
    members
        .range((Bound::Excluded(token), Bound::Unbounded))
        .next()
        .or_else(|| members.iter().next())
        .map(|(_, node)| node)
}

fn prev_before<H>(members: &BTreeMap<HashToken, Node<H>>, token: HashToken) -> Option<&Node<H>> {
    members
        .range(..token)
        .next_back()
        .or_else(|| members.iter().next_back())
        .map(|(_, node)| node)
}

/// Builder for rings with a fixed starting membership.
///
/// # Example
///
/// ```rust
/// use corelib::ring::RingBuilder;
///
/// let ring = RingBuilder::new()
///     .add_node("localhost:8090", ())
///     .add_node("localhost:8091", ())
///     .build()
///     .unwrap();
/// assert_eq!(ring.len(), 2);
/// ```
#[derive(Debug)]
pub struct RingBuilder<H> {
    partitioner: Arc<dyn Partitioner>,
    members: Vec<(String, H)>,
}

impl<H: Clone> Default for RingBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> RingBuilder<H> {
    pub fn new() -> Self {
        Self {
            partitioner: Arc::new(Sha256Partitioner),
            members: Vec::new(),
        }
    }

    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn add_node(mut self, address: impl Into<String>, handle: H) -> Self {
        self.members.push((address.into(), handle));
        self
    }

    /// Fails with `DuplicateHash` if two addresses land on the same token.
    pub fn build(self) -> Result<HashRing<H>> {
        let ring = HashRing::with_partitioner(self.partitioner);
        for (address, handle) in self.members {
            let node = ring.node(address, handle);
            ring.insert(node)?;
        }
        Ok(ring)
    }
}

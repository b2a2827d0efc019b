//! Routes object reads and writes to the owning node.

use std::sync::Arc;

use bytes::Bytes;
use corelib::{HashRing, Node};
use store::ObjectKey;
use tracing::debug;

use crate::connector::PeerHandle;
use crate::error::{ClusterError, Result};

/// Stateless front over the shared ring. Cheap to clone.
///
/// A request that races a membership change may reach the previous owner;
/// there is no retry on another node.
#[derive(Clone)]
pub struct Router {
    ring: Arc<HashRing<PeerHandle>>,
}

impl Router {
    pub fn new(ring: Arc<HashRing<PeerHandle>>) -> Self {
        Self { ring }
    }

    /// Member that currently owns `key`.
    pub fn owner_of(&self, key: &ObjectKey) -> Result<Node<PeerHandle>> {
        Ok(self.ring.lookup_key(&key.composite())?)
    }

    pub async fn read(&self, key: &ObjectKey) -> Result<Bytes> {
        let owner = self.owner_of(key)?;
        debug!(key = %key, address = %owner.address, "routing read");
        owner
            .handle
            .read(key)
            .await
            .map_err(|e| ClusterError::from_store(&owner.address, e))
    }

    pub async fn write(&self, key: &ObjectKey, data: Bytes) -> Result<()> {
        let owner = self.owner_of(key)?;
        debug!(key = %key, address = %owner.address, bytes = data.len(), "routing write");
        owner
            .handle
            .write(key, data)
            .await
            .map_err(|e| ClusterError::from_store(&owner.address, e))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("members", &self.ring.snapshot())
            .finish()
    }
}

//! Opening connections to storage nodes.

use std::sync::Arc;

use async_trait::async_trait;
use store::{NodeStore, StoreError};
use transport::{StorageClient, Timeouts};

/// Shared handle to one member's store. Every router and migration call to
/// that member goes through the same handle.
pub type PeerHandle = Arc<dyn NodeStore>;

/// Produces a connected handle for a node address.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, address: &str) -> Result<PeerHandle, StoreError>;
}

/// Connects over TCP with the configured deadlines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector {
    timeouts: Timeouts,
}

impl TcpConnector {
    pub fn new(timeouts: Timeouts) -> Self {
        Self { timeouts }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, address: &str) -> Result<PeerHandle, StoreError> {
        let client = StorageClient::connect(address, self.timeouts).await?;
        Ok(Arc::new(client))
    }
}

//! Shared fixtures: pinned hashes, in-process nodes, injected faults.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cluster::{Connector, MembershipController, PeerHandle};
use corelib::{HashRing, TablePartitioner};
use store::{MemoryStore, NodeStore, ObjectKey, Result, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    FailRead,
    FailWrite,
    FailRemove,
    FailList,
    HangRead,
}

/// In-memory node that can be told to misbehave.
#[derive(Debug, Default)]
pub struct TestStore {
    inner: MemoryStore,
    fault: Option<Fault>,
    closed: AtomicBool,
}

impl TestStore {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn faulty(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            fault: Some(fault),
            ..Self::default()
        })
    }

    pub fn holds(&self, key: &ObjectKey) -> bool {
        self.inner.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn injected(&self) -> StoreError {
        StoreError::Unreachable {
            address: "test".into(),
            reason: "injected fault".into(),
        }
    }
}

#[async_trait]
impl NodeStore for TestStore {
    async fn read(&self, key: &ObjectKey) -> Result<Bytes> {
        match self.fault {
            Some(Fault::FailRead) => Err(self.injected()),
            Some(Fault::HangRead) => std::future::pending().await,
            _ => self.inner.read(key).await,
        }
    }

    async fn write(&self, key: &ObjectKey, data: Bytes) -> Result<()> {
        match self.fault {
            Some(Fault::FailWrite) => Err(self.injected()),
            _ => self.inner.write(key, data).await,
        }
    }

    async fn remove(&self, key: &ObjectKey) -> Result<()> {
        match self.fault {
            Some(Fault::FailRemove) => Err(self.injected()),
            _ => self.inner.remove(key).await,
        }
    }

    async fn list(&self) -> Result<Vec<ObjectKey>> {
        match self.fault {
            Some(Fault::FailList) => Err(self.injected()),
            _ => self.inner.list().await,
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands out pre-registered stores by address; unknown addresses refuse.
#[derive(Default)]
pub struct MemConnector {
    nodes: parking_lot::Mutex<HashMap<String, PeerHandle>>,
}

impl MemConnector {
    pub fn register(&self, address: &str, store: Arc<TestStore>) {
        self.nodes.lock().insert(address.to_string(), store);
    }
}

#[async_trait]
impl Connector for MemConnector {
    async fn connect(&self, address: &str) -> Result<PeerHandle> {
        self.nodes
            .lock()
            .get(address)
            .cloned()
            .ok_or_else(|| StoreError::Unreachable {
                address: address.to_string(),
                reason: "connection refused".into(),
            })
    }
}

pub struct Cluster {
    pub controller: Arc<MembershipController>,
    pub connector: Arc<MemConnector>,
}

impl Cluster {
    /// Controller over pinned hashes. `entries` pins both node addresses and
    /// composite keys.
    pub fn new(entries: &[(&str, u64)], rpc_timeout: Duration) -> Self {
        let ring = Arc::new(HashRing::with_partitioner(TablePartitioner::new(entries)));
        let connector = Arc::new(MemConnector::default());
        let controller = Arc::new(MembershipController::new(
            ring,
            connector.clone(),
            rpc_timeout,
        ));
        Self {
            controller,
            connector,
        }
    }

    pub fn node(&self, address: &str, store: Arc<TestStore>) -> Arc<TestStore> {
        self.connector.register(address, store.clone());
        store
    }
}

pub fn key(composite: &str) -> ObjectKey {
    ObjectKey::parse(composite).unwrap()
}

pub fn bytes_of(composite: &str) -> Bytes {
    Bytes::from(format!("payload:{composite}"))
}

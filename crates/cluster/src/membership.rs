//! Membership controller: bootstrap, join, and leave.
//!
//! Changes are serialized by `change_lock`, held for the whole change
//! including migration. The ring's own lock is only taken for lookups and
//! the final splice, so routed traffic keeps flowing while keys move.

use std::sync::Arc;
use std::time::Duration;

use corelib::{topology, HashRing, MemberInfo, OwnershipRange};
use metrics::{counter, gauge};
use store::StoreError;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::connector::{Connector, PeerHandle};
use crate::error::{ClusterError, Result};
use crate::migration::{migrate_keys, with_deadline, MigrationReport};
use crate::router::Router;

/// Owns the ring and every change made to it.
pub struct MembershipController {
    ring: Arc<HashRing<PeerHandle>>,
    connector: Arc<dyn Connector>,
    change_lock: Mutex<()>,
    rpc_timeout: Duration,
}

impl MembershipController {
    pub fn new(ring: Arc<HashRing<PeerHandle>>, connector: Arc<dyn Connector>, rpc_timeout: Duration) -> Self {
        Self {
            ring,
            connector,
            change_lock: Mutex::new(()),
            rpc_timeout,
        }
    }

    pub fn ring(&self) -> &Arc<HashRing<PeerHandle>> {
        &self.ring
    }

    pub fn router(&self) -> Router {
        Router::new(Arc::clone(&self.ring))
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    /// Connects to each address and inserts it without migrating anything.
    ///
    /// Stops at the first failure; members inserted before it stay.
    pub async fn bootstrap<I, S>(&self, addresses: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _change = self.change_lock.lock().await;
        for address in addresses {
            let address = address.as_ref();
            self.reject_duplicate(address)?;
            let handle = self
                .connector
                .connect(address)
                .await
                .map_err(|source| ClusterError::NodeUnreachable {
                    address: address.to_string(),
                    source,
                })?;
            let node = self.ring.node(address, handle);
            info!(address, token = %node.token, "bootstrapped node");
            self.ring.insert(node)?;
        }
        self.record_membership("bootstrap");
        Ok(())
    }

    /// Adds a node, first moving over the keys it will own.
    ///
    /// The node receives routed traffic only once its keys are in place.
    pub async fn add_node(&self, address: &str) -> Result<MigrationReport> {
        let _change = self.change_lock.lock().await;
        self.reject_duplicate(address)?;

        let handle = self
            .connector
            .connect(address)
            .await
            .map_err(|source| ClusterError::UnreachableNewNode {
                address: address.to_string(),
                source,
            })?;
        let node = self.ring.node(address, handle);
        let mut report = MigrationReport::default();

        if !self.ring.is_empty() {
            let successor = self.ring.successor(node.token)?;
            let predecessor = self.ring.predecessor(node.token)?;
            let incoming = OwnershipRange::new(predecessor.token, node.token);
            debug!(address, successor = %successor.address, range = %incoming, "moving keys to joining node");

            let listed = match with_deadline(self.rpc_timeout, successor.handle.list()).await {
                Ok(keys) => keys,
                Err(reason) => {
                    node.handle.close().await;
                    return Err(ClusterError::NodeUnreachable {
                        address: successor.address.clone(),
                        source: StoreError::Unreachable {
                            address: successor.address,
                            reason,
                        },
                    });
                }
            };
            let moving = listed
                .into_iter()
                .filter(|key| incoming.contains(self.ring.token_for(&key.composite())));

            migrate_keys(
                moving,
                successor.handle.as_ref(),
                node.handle.as_ref(),
                self.rpc_timeout,
                &mut report,
            )
            .await;
        }

        let token = node.token;
        if let Err(e) = self.ring.insert(node.clone()) {
            node.handle.close().await;
            return Err(e.into());
        }
        info!(
            address,
            %token,
            migrated = report.migrated_count(),
            skipped = report.skipped_count(),
            "node joined"
        );
        self.record_change("add_node", &report);
        Ok(report)
    }

    /// Removes a node after moving its keys to its successor.
    ///
    /// The node is removed even if it cannot be listed; the report says so.
    pub async fn remove_node(&self, address: &str) -> Result<MigrationReport> {
        let _change = self.change_lock.lock().await;
        let node = self
            .ring
            .get(address)
            .ok_or_else(|| ClusterError::NodeNotFound(address.to_string()))?;
        let mut report = MigrationReport::default();

        if self.ring.len() > 1 {
            let successor = self.ring.successor_of(address)?;
            debug!(address, successor = %successor.address, "moving keys off departing node");

            match with_deadline(self.rpc_timeout, node.handle.list()).await {
                Ok(keys) => {
                    migrate_keys(
                        keys,
                        node.handle.as_ref(),
                        successor.handle.as_ref(),
                        self.rpc_timeout,
                        &mut report,
                    )
                    .await;
                }
                Err(reason) => {
                    warn!(address, %reason, "could not list departing node; removing it anyway");
                    report.enumeration_failure = Some(reason);
                }
            }
        }

        let removal = self.ring.remove(address)?;
        removal.node.handle.close().await;
        info!(
            address,
            successor = removal.successor.as_ref().map(|s| s.address.as_str()),
            migrated = report.migrated_count(),
            skipped = report.skipped_count(),
            "node left"
        );
        self.record_change("remove_node", &report);
        Ok(report)
    }

    /// Member addresses, ascending by token.
    pub fn list_nodes(&self) -> Vec<String> {
        self.ring.snapshot()
    }

    pub fn describe(&self) -> Vec<MemberInfo> {
        topology::describe(&self.ring)
    }

    fn reject_duplicate(&self, address: &str) -> Result<()> {
        let token = self.ring.token_for(address);
        match self.ring.lookup(token) {
            Ok(owner) if owner.token == token => Err(ClusterError::DuplicateHash {
                address: address.to_string(),
                token,
                existing: owner.address,
            }),
            _ => Ok(()),
        }
    }

    fn record_change(&self, op: &'static str, report: &MigrationReport) {
        counter!("segstore_keys_migrated_total", "op" => op).increment(report.migrated_count());
        counter!("segstore_keys_skipped_total", "op" => op).increment(report.skipped_count());
        self.record_membership(op);
    }

    fn record_membership(&self, op: &'static str) {
        counter!("segstore_membership_changes_total", "op" => op).increment(1);
        gauge!("segstore_ring_nodes").set(self.ring.len() as f64);
    }
}

impl std::fmt::Debug for MembershipController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipController")
            .field("members", &self.ring.snapshot())
            .field("rpc_timeout", &self.rpc_timeout)
            .finish()
    }
}

//! Moving segments between nodes.
//!
//! A key moves in three steps: read from the source, write to the
//! destination, remove from the source. The steps are not transactional. A
//! failed step is recorded against the key and the key is skipped; the
//! surrounding membership change carries on.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use store::{NodeStore, ObjectKey, StoreError};
use tokio::time::timeout;
use tracing::{debug, warn};
use transport::MigrationSummary;

/// Step of the per-key move that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationStage {
    Read,
    Write,
    Remove,
}

impl fmt::Display for MigrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStage::Read => f.write_str("read"),
            MigrationStage::Write => f.write_str("write"),
            MigrationStage::Remove => f.write_str("remove"),
        }
    }
}

/// Result of moving one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Migrated,
    Skipped { stage: MigrationStage, reason: String },
}

/// A key left behind by a failed step.
///
/// A `Read` or `Write` failure leaves the key on the source only. A `Remove`
/// failure leaves a copy on both nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedKey {
    pub key: ObjectKey,
    pub stage: MigrationStage,
    pub reason: String,
}

/// What a membership change moved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: Vec<ObjectKey>,
    pub skipped: Vec<SkippedKey>,
    /// Why the source node could not be listed, if it could not.
    pub enumeration_failure: Option<String>,
}

impl MigrationReport {
    pub fn migrated_count(&self) -> u64 {
        self.migrated.len() as u64
    }

    pub fn skipped_count(&self) -> u64 {
        self.skipped.len() as u64
    }

    pub fn record(&mut self, key: ObjectKey, outcome: KeyOutcome) {
        match outcome {
            KeyOutcome::Migrated => self.migrated.push(key),
            KeyOutcome::Skipped { stage, reason } => {
                self.skipped.push(SkippedKey { key, stage, reason })
            }
        }
    }

    /// Wire form for the admin surface.
    pub fn summary(&self) -> MigrationSummary {
        MigrationSummary {
            migrated: self.migrated_count(),
            skipped: self.skipped_count(),
            enumeration_failure: self.enumeration_failure.clone(),
        }
    }
}

/// Runs a store call under `deadline`, folding a timeout into the error.
pub(crate) async fn with_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, String> {
    match timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {deadline:?}")),
    }
}

/// Moves one key from `source` to `destination`.
pub async fn migrate_key(
    key: &ObjectKey,
    source: &dyn NodeStore,
    destination: &dyn NodeStore,
    deadline: Duration,
) -> KeyOutcome {
    let data = match with_deadline(deadline, source.read(key)).await {
        Ok(data) => data,
        Err(reason) => return skipped(key, MigrationStage::Read, reason),
    };
    if let Err(reason) = with_deadline(deadline, destination.write(key, data)).await {
        return skipped(key, MigrationStage::Write, reason);
    }
    if let Err(reason) = with_deadline(deadline, source.remove(key)).await {
        return skipped(key, MigrationStage::Remove, reason);
    }
    debug!(key = %key, "migrated");
    KeyOutcome::Migrated
}

fn skipped(key: &ObjectKey, stage: MigrationStage, reason: String) -> KeyOutcome {
    warn!(key = %key, %stage, %reason, "skipping key");
    KeyOutcome::Skipped { stage, reason }
}

/// Moves every key in `keys`, one at a time, into `report`.
pub async fn migrate_keys(
    keys: impl IntoIterator<Item = ObjectKey>,
    source: &dyn NodeStore,
    destination: &dyn NodeStore,
    deadline: Duration,
    report: &mut MigrationReport,
) {
    for key in keys {
        let outcome = migrate_key(&key, source, destination, deadline).await;
        report.record(key, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use store::MemoryStore;

    fn key(segment: &str) -> ObjectKey {
        ObjectKey::new("v1", segment).unwrap()
    }

    #[tokio::test]
    async fn test_migrate_key_moves_bytes() {
        let source = MemoryStore::new();
        let destination = MemoryStore::new();
        let k = key("seg_001.m4s");
        source.write(&k, Bytes::from_static(b"abc")).await.unwrap();

        let outcome = migrate_key(&k, &source, &destination, Duration::from_secs(1)).await;
        assert_eq!(outcome, KeyOutcome::Migrated);
        assert!(!source.contains(&k));
        assert_eq!(destination.read(&k).await.unwrap(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn test_missing_key_is_skipped_at_read() {
        let source = MemoryStore::new();
        let destination = MemoryStore::new();

        let outcome = migrate_key(&key("gone.m4s"), &source, &destination, Duration::from_secs(1)).await;
        assert!(matches!(
            outcome,
            KeyOutcome::Skipped {
                stage: MigrationStage::Read,
                ..
            }
        ));
        assert!(destination.is_empty());
    }

    #[test]
    fn test_report_summary() {
        let mut report = MigrationReport::default();
        report.record(key("a"), KeyOutcome::Migrated);
        report.record(
            key("b"),
            KeyOutcome::Skipped {
                stage: MigrationStage::Remove,
                reason: "boom".into(),
            },
        );
        let summary = report.summary();
        assert_eq!(summary.migrated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.enumeration_failure, None);
        assert_eq!(report.skipped[0].stage, MigrationStage::Remove);
    }
}

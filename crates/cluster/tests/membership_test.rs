//! Membership changes over in-process nodes with pinned hashes.
//!
//! Node tokens: A=10, B=50, C=20, D=70, E=5. Key tokens are the number in
//! the segment name (`v/k15` hashes to 15).

mod common;

use std::sync::Arc;
use std::time::Duration;

use cluster::{ClusterError, MigrationStage};
use common::{bytes_of, key, Cluster, Fault, TestStore};

const PINS: &[(&str, u64)] = &[
    ("node-a:8090", 10),
    ("node-b:8090", 50),
    ("node-c:8090", 20),
    ("node-d:8090", 70),
    ("node-e:8090", 5),
    ("v/k5", 5),
    ("v/k15", 15),
    ("v/k30", 30),
    ("v/k60", 60),
];

const A: &str = "node-a:8090";
const B: &str = "node-b:8090";
const C: &str = "node-c:8090";
const D: &str = "node-d:8090";
const E: &str = "node-e:8090";

const TIMEOUT: Duration = Duration::from_millis(200);

async fn write_all(cluster: &Cluster, keys: &[&str]) {
    let router = cluster.controller.router();
    for composite in keys {
        router.write(&key(composite), bytes_of(composite)).await.unwrap();
    }
}

async fn assert_readable(cluster: &Cluster, keys: &[&str]) {
    let router = cluster.controller.router();
    for composite in keys {
        assert_eq!(
            router.read(&key(composite)).await.unwrap(),
            bytes_of(composite),
            "{composite}"
        );
    }
}

#[tokio::test]
async fn test_add_node_takes_only_its_range() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    let a = cluster.node(A, TestStore::healthy());
    let b = cluster.node(B, TestStore::healthy());
    let c = cluster.node(C, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k5", "v/k15", "v/k30", "v/k60"]).await;

    assert!(b.holds(&key("v/k15")));
    assert!(b.holds(&key("v/k30")));
    assert!(a.holds(&key("v/k60")));

    let report = cluster.controller.add_node(C).await.unwrap();

    assert_eq!(report.migrated, vec![key("v/k15")]);
    assert!(report.skipped.is_empty());
    assert!(c.holds(&key("v/k15")));
    assert!(!b.holds(&key("v/k15")));
    assert!(b.holds(&key("v/k30")));
    assert_eq!(cluster.controller.list_nodes(), vec![A, C, B]);
    assert_readable(&cluster, &["v/k5", "v/k15", "v/k30", "v/k60"]).await;
}

#[tokio::test]
async fn test_add_node_on_empty_ring_owns_everything() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());

    let report = cluster.controller.add_node(A).await.unwrap();
    assert_eq!(report.migrated_count(), 0);
    assert_eq!(report.skipped_count(), 0);

    let members = cluster.controller.describe();
    assert_eq!(members.len(), 1);
    assert!(members[0].share > 0.999);
    write_all(&cluster, &["v/k5", "v/k60"]).await;
    assert_readable(&cluster, &["v/k5", "v/k60"]).await;
}

#[tokio::test]
async fn test_add_node_past_the_largest_token() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    let a = cluster.node(A, TestStore::healthy());
    let d = cluster.node(D, TestStore::healthy());
    cluster.node(B, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k5", "v/k60"]).await;

    // D=70 takes (50, 70] from A, which owned it by wrapping.
    let report = cluster.controller.add_node(D).await.unwrap();
    assert_eq!(report.migrated, vec![key("v/k60")]);
    assert!(d.holds(&key("v/k60")));
    assert!(a.holds(&key("v/k5")));
    assert_readable(&cluster, &["v/k5", "v/k60"]).await;
}

#[tokio::test]
async fn test_add_node_with_wrapping_range() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    let a = cluster.node(A, TestStore::healthy());
    let e = cluster.node(E, TestStore::healthy());
    cluster.node(B, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k5", "v/k15", "v/k60"]).await;

    // E=5 takes (50, 5] across zero.
    let report = cluster.controller.add_node(E).await.unwrap();
    assert_eq!(report.migrated_count(), 2);
    assert!(e.holds(&key("v/k5")));
    assert!(e.holds(&key("v/k60")));
    assert_eq!(a.len(), 0);
    assert_eq!(cluster.controller.list_nodes(), vec![E, A, B]);
    assert_readable(&cluster, &["v/k5", "v/k15", "v/k60"]).await;
}

#[tokio::test]
async fn test_add_unreachable_node_changes_nothing() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    cluster.controller.bootstrap([A]).await.unwrap();

    let err = cluster.controller.add_node(C).await.unwrap_err();
    assert!(matches!(err, ClusterError::UnreachableNewNode { ref address, .. } if address == C));
    assert_eq!(cluster.controller.list_nodes(), vec![A]);
}

#[tokio::test]
async fn test_add_duplicate_node() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    cluster.controller.add_node(A).await.unwrap();

    let err = cluster.controller.add_node(A).await.unwrap_err();
    assert!(matches!(err, ClusterError::DuplicateHash { ref existing, .. } if existing == A));
    assert_eq!(cluster.controller.list_nodes(), vec![A]);
}

#[tokio::test]
async fn test_add_node_fails_when_successor_cannot_be_listed() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    cluster.node(B, TestStore::faulty(Fault::FailList));
    let c = cluster.node(C, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();

    let err = cluster.controller.add_node(C).await.unwrap_err();
    assert!(matches!(err, ClusterError::NodeUnreachable { ref address, .. } if address == B));
    assert!(c.is_closed());
    assert_eq!(cluster.controller.list_nodes(), vec![A, B]);
}

#[tokio::test]
async fn test_failed_remove_leaves_a_copy_behind() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    let b = cluster.node(B, TestStore::faulty(Fault::FailRemove));
    let c = cluster.node(C, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k15", "v/k30"]).await;

    let report = cluster.controller.add_node(C).await.unwrap();
    assert_eq!(report.migrated_count(), 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, key("v/k15"));
    assert_eq!(report.skipped[0].stage, MigrationStage::Remove);
    assert!(b.holds(&key("v/k15")));
    assert!(c.holds(&key("v/k15")));
    // The node joins regardless.
    assert_eq!(cluster.controller.list_nodes(), vec![A, C, B]);
}

#[tokio::test]
async fn test_failed_write_keeps_key_on_source() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    let b = cluster.node(B, TestStore::healthy());
    cluster.node(C, TestStore::faulty(Fault::FailWrite));
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k15"]).await;

    let report = cluster.controller.add_node(C).await.unwrap();
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.skipped[0].stage, MigrationStage::Write);
    assert!(b.holds(&key("v/k15")));
}

#[tokio::test]
async fn test_remove_node_hands_keys_to_successor() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    let b = cluster.node(B, TestStore::healthy());
    let c = cluster.node(C, TestStore::healthy());
    cluster.controller.bootstrap([A, B, C]).await.unwrap();
    write_all(&cluster, &["v/k5", "v/k15", "v/k30", "v/k60"]).await;
    assert!(c.holds(&key("v/k15")));

    let report = cluster.controller.remove_node(C).await.unwrap();
    assert_eq!(report.migrated, vec![key("v/k15")]);
    assert!(b.holds(&key("v/k15")));
    assert_eq!(c.len(), 0);
    assert!(c.is_closed());
    assert_eq!(cluster.controller.list_nodes(), vec![A, B]);
    assert_readable(&cluster, &["v/k5", "v/k15", "v/k30", "v/k60"]).await;
}

#[tokio::test]
async fn test_remove_largest_node_wraps_to_smallest() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    let a = cluster.node(A, TestStore::healthy());
    cluster.node(B, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k15", "v/k30"]).await;

    let report = cluster.controller.remove_node(B).await.unwrap();
    assert_eq!(report.migrated_count(), 2);
    assert!(a.holds(&key("v/k15")));
    assert!(a.holds(&key("v/k30")));
}

#[tokio::test]
async fn test_remove_only_node_empties_the_ring() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    let a = cluster.node(A, TestStore::healthy());
    cluster.controller.bootstrap([A]).await.unwrap();
    write_all(&cluster, &["v/k5"]).await;

    let report = cluster.controller.remove_node(A).await.unwrap();
    assert_eq!(report.migrated_count(), 0);
    assert!(a.is_closed());
    assert!(cluster.controller.list_nodes().is_empty());

    let err = cluster.controller.router().read(&key("v/k5")).await.unwrap_err();
    assert!(matches!(err, ClusterError::EmptyRing));
}

#[tokio::test]
async fn test_remove_unknown_node() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    cluster.controller.bootstrap([A]).await.unwrap();

    let err = cluster.controller.remove_node(B).await.unwrap_err();
    assert!(matches!(err, ClusterError::NodeNotFound(ref address) if address == B));
    assert_eq!(cluster.controller.list_nodes(), vec![A]);
}

#[tokio::test]
async fn test_remove_unlistable_node_still_removes_it() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    let c = cluster.node(C, TestStore::faulty(Fault::FailList));
    cluster.node(B, TestStore::healthy());
    cluster.controller.bootstrap([A, B, C]).await.unwrap();

    let report = cluster.controller.remove_node(C).await.unwrap();
    assert!(report.enumeration_failure.is_some());
    assert_eq!(report.summary().migrated, 0);
    assert!(c.is_closed());
    assert_eq!(cluster.controller.list_nodes(), vec![A, B]);
}

#[tokio::test]
async fn test_hanging_read_is_skipped_after_deadline() {
    let cluster = Cluster::new(PINS, Duration::from_millis(50));
    let a = cluster.node(A, TestStore::healthy());
    let b = cluster.node(B, TestStore::faulty(Fault::HangRead));
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k15", "v/k30"]).await;

    let report = tokio::time::timeout(Duration::from_secs(5), cluster.controller.remove_node(B))
        .await
        .expect("removal must not hang")
        .unwrap();
    assert_eq!(report.skipped_count(), 2);
    assert!(report
        .skipped
        .iter()
        .all(|skipped| skipped.stage == MigrationStage::Read && skipped.reason.contains("timed out")));
    assert_eq!(a.len(), 0);
    assert!(b.is_closed());
    assert_eq!(cluster.controller.list_nodes(), vec![A]);
}

#[tokio::test]
async fn test_bootstrap_rejects_duplicates_and_unreachable_nodes() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());

    let err = cluster.controller.bootstrap([A, A]).await.unwrap_err();
    assert!(matches!(err, ClusterError::DuplicateHash { .. }));

    let err = cluster.controller.bootstrap([B]).await.unwrap_err();
    assert!(matches!(err, ClusterError::NodeUnreachable { .. }));
    assert_eq!(cluster.controller.list_nodes(), vec![A]);
}

#[tokio::test]
async fn test_concurrent_changes_are_serialized() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    cluster.node(B, TestStore::healthy());
    cluster.node(C, TestStore::healthy());
    cluster.node(D, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();
    let keys = ["v/k5", "v/k15", "v/k30", "v/k60"];
    write_all(&cluster, &keys).await;

    let first = {
        let controller = Arc::clone(&cluster.controller);
        tokio::spawn(async move { controller.add_node(C).await })
    };
    let second = {
        let controller = Arc::clone(&cluster.controller);
        tokio::spawn(async move { controller.add_node(D).await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(cluster.controller.list_nodes(), vec![A, C, B, D]);
    assert_readable(&cluster, &keys).await;
}

#[tokio::test]
async fn test_reads_during_membership_change_reach_a_holder() {
    let cluster = Cluster::new(PINS, TIMEOUT);
    cluster.node(A, TestStore::healthy());
    cluster.node(B, TestStore::healthy());
    cluster.node(C, TestStore::healthy());
    cluster.controller.bootstrap([A, B]).await.unwrap();
    write_all(&cluster, &["v/k30"]).await;

    // k30 stays on B throughout the join of C.
    let reader = {
        let router = cluster.controller.router();
        tokio::spawn(async move {
            for _ in 0..100 {
                router.read(&key("v/k30")).await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };
    cluster.controller.add_node(C).await.unwrap();
    reader.await.unwrap();
}

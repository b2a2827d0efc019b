//! Cluster coordination for the segment store.
//!
//! A gateway process owns one [`MembershipController`]. It holds the ring of
//! storage nodes, routes reads and writes through a [`Router`], and moves
//! segments between nodes when the membership changes.

pub mod config;
pub mod connector;
pub mod error;
pub mod gateway;
pub mod membership;
pub mod migration;
pub mod router;

pub use config::{ClusterConfig, ConfigError};
pub use connector::{Connector, PeerHandle, TcpConnector};
pub use error::{ClusterError, Result};
pub use gateway::GatewayService;
pub use membership::MembershipController;
pub use migration::{KeyOutcome, MigrationReport, MigrationStage, SkippedKey};
pub use router::Router;

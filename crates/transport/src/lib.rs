//! Wire protocol between gateways, storage nodes, and operators.
//!
//! This crate provides:
//! - Length-prefixed bincode framing over TCP
//! - Request/response enums for the storage-node and gateway surfaces
//! - Persistent-connection clients with per-request deadlines
//! - A generic serving loop that dispatches frames to a [`Handler`]

pub mod codec;
pub mod error;
pub mod protocol;
pub mod receiver;
pub mod sender;

pub use error::TransportError;
pub use protocol::{
    ErrorKind, GatewayRequest, GatewayResponse, MigrationSummary, RemoteError, StorageRequest,
    StorageResponse,
};
pub use receiver::{serve, Handler, StoreService};
pub use sender::{Connection, GatewayClient, StorageClient, Timeouts};

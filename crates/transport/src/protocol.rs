//! Request and response messages.
//!
//! Two surfaces share the framing in [`crate::codec`]:
//! - the storage-node surface (`StorageRequest`/`StorageResponse`), served by
//!   every storage node and consumed by gateways;
//! - the gateway surface (`GatewayRequest`/`GatewayResponse`): routed data
//!   access plus membership administration, consumed by operators and the
//!   upload/playback front end.
//!
//! Errors travel as [`RemoteError`] so the caller can still tell `NotFound`
//! from a routing or transport failure.

use std::fmt;

use bytes::Bytes;
use corelib::MemberInfo;
use serde::{Deserialize, Serialize};

/// Storage-node requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StorageRequest {
    Read {
        group_id: String,
        segment_name: String,
    },
    Write {
        group_id: String,
        segment_name: String,
        data: Bytes,
    },
    Remove {
        group_id: String,
        segment_name: String,
    },
    /// All objects on the node as `group/segment` strings.
    List,
}

/// Storage-node responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum StorageResponse {
    Data(Bytes),
    Written,
    Removed,
    Keys(Vec<String>),
    Error(RemoteError),
}

/// Gateway requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GatewayRequest {
    Read {
        group_id: String,
        segment_name: String,
    },
    Write {
        group_id: String,
        segment_name: String,
        data: Bytes,
    },
    ListNodes,
    DescribeRing,
    AddNode {
        address: String,
    },
    RemoveNode {
        address: String,
    },
}

/// Gateway responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GatewayResponse {
    Data(Bytes),
    Written,
    /// Member addresses, ascending by token.
    Nodes(Vec<String>),
    Ring(Vec<MemberInfo>),
    Migrated(MigrationSummary),
    Error(RemoteError),
}

/// Outcome of a membership change as reported to the operator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    pub migrated: u64,
    pub skipped: u64,
    /// Set when the departing node could not be listed during a removal.
    pub enumeration_failure: Option<String>,
}

/// Failure category, preserved across the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    InvalidKey,
    EmptyRing,
    NodeUnreachable,
    NodeNotFound,
    DuplicateHash,
    UnreachableNewNode,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidKey => "invalid key",
            ErrorKind::EmptyRing => "empty ring",
            ErrorKind::NodeUnreachable => "node unreachable",
            ErrorKind::NodeNotFound => "node not found",
            ErrorKind::DuplicateHash => "duplicate hash",
            ErrorKind::UnreachableNewNode => "new node unreachable",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// An error reported by the remote side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

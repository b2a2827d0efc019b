//! Client side: persistent connections and typed clients.
//!
//! One [`Connection`] per peer carries every request to it. Requests on a
//! connection are serialized; a broken or timed-out connection is dropped and
//! re-dialed on the next request, until [`Connection::close`] is called.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use corelib::MemberInfo;
use serde::{de::DeserializeOwned, Serialize};
use store::{NodeStore, ObjectKey, StoreError};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

use crate::codec::{read_frame, write_frame};
use crate::error::TransportError;
use crate::protocol::{
    ErrorKind, GatewayRequest, GatewayResponse, MigrationSummary, StorageRequest, StorageResponse,
};

/// Deadlines applied to every connection attempt and request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            request: Duration::from_secs(10),
        }
    }
}

/// Persistent, reconnecting connection to one peer.
#[derive(Debug)]
pub struct Connection {
    address: String,
    timeouts: Timeouts,
    stream: Mutex<Option<TcpStream>>,
    closed: AtomicBool,
}

impl Connection {
    /// Dials `address` immediately; fails if the peer cannot be reached.
    pub async fn open(address: impl Into<String>, timeouts: Timeouts) -> Result<Self, TransportError> {
        let address = address.into();
        let stream = dial(&address, timeouts.connect).await?;
        Ok(Self {
            address,
            timeouts,
            stream: Mutex::new(Some(stream)),
            closed: AtomicBool::new(false),
        })
    }

    /// Defers dialing to the first request.
    pub fn lazy(address: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            address: address.into(),
            timeouts,
            stream: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Sends one request and waits for its response, within the request
    /// deadline. The deadline covers waiting for the connection too.
    ///
    /// Cancel safe: if the returned future is dropped mid-exchange the
    /// stream is discarded, so a late reply is never read by the next caller.
    pub async fn call<Req, Resp>(&self, request: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let deadline = Instant::now() + self.timeouts.request;
        match timeout_at(deadline, self.exchange(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                address: self.address.clone(),
                after: self.timeouts.request,
            }),
        }
    }

    async fn exchange<Req, Resp>(&self, request: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }

        let mut guard = self.stream.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }
        if guard.is_none() {
            *guard = Some(dial(&self.address, self.timeouts.connect).await?);
        }

        let mut in_flight = InFlight {
            slot: &mut *guard,
            completed: false,
        };
        let Some(stream) = in_flight.slot.as_mut() else {
            return Err(self.closed_error());
        };
        let exchanged = async {
            write_frame(&mut *stream, request).await?;
            read_frame::<_, Resp>(&mut *stream).await
        }
        .await;
        match exchanged {
            Ok(response) => {
                in_flight.completed = true;
                Ok(response)
            }
            Err(source) => Err(TransportError::Io {
                address: self.address.clone(),
                source,
            }),
        }
    }

    /// Shuts the connection down. Later calls fail with `Closed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut stream) = self.stream.lock().await.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(address = %self.address, error = %e, "shutdown after close failed");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn closed_error(&self) -> TransportError {
        TransportError::Closed {
            address: self.address.clone(),
        }
    }

    fn unexpected(&self) -> TransportError {
        TransportError::UnexpectedResponse {
            address: self.address.clone(),
        }
    }
}

/// Drops the stream unless the exchange finished. A stream abandoned
/// between request and reply may still hold half a frame or a stale reply.
struct InFlight<'a> {
    slot: &'a mut Option<TcpStream>,
    completed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.slot = None;
        }
    }
}

async fn dial(address: &str, connect_timeout: Duration) -> Result<TcpStream, TransportError> {
    let stream = match timeout(connect_timeout, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(TransportError::Connect {
                address: address.to_string(),
                source,
            })
        }
        Err(_) => {
            return Err(TransportError::Connect {
                address: address.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no answer within {connect_timeout:?}"),
                ),
            })
        }
    };
    if let Err(e) = stream.set_nodelay(true) {
        debug!(address, error = %e, "set_nodelay failed");
    }
    debug!(address, "connected");
    Ok(stream)
}

/// [`NodeStore`] backed by a remote storage node.
#[derive(Debug)]
pub struct StorageClient {
    conn: Connection,
}

impl StorageClient {
    /// Connects eagerly; used when a node joins so an unreachable node is
    /// rejected before anything changes.
    pub async fn connect(address: impl Into<String>, timeouts: Timeouts) -> Result<Self, TransportError> {
        Ok(Self {
            conn: Connection::open(address, timeouts).await?,
        })
    }

    pub fn lazy(address: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            conn: Connection::lazy(address, timeouts),
        }
    }

    pub fn address(&self) -> &str {
        self.conn.address()
    }

    async fn request(&self, request: &StorageRequest, key: Option<&ObjectKey>) -> Result<StorageResponse, StoreError> {
        match self.conn.call::<_, StorageResponse>(request).await? {
            StorageResponse::Error(error) => match (error.kind, key) {
                (ErrorKind::NotFound, Some(key)) => Err(StoreError::NotFound(key.clone())),
                _ => Err(TransportError::Remote {
                    address: self.conn.address().to_string(),
                    error,
                }
                .into()),
            },
            response => Ok(response),
        }
    }
}

#[async_trait]
impl NodeStore for StorageClient {
    async fn read(&self, key: &ObjectKey) -> Result<Bytes, StoreError> {
        let request = StorageRequest::Read {
            group_id: key.group_id().to_string(),
            segment_name: key.segment_name().to_string(),
        };
        match self.request(&request, Some(key)).await? {
            StorageResponse::Data(data) => Ok(data),
            _ => Err(self.conn.unexpected().into()),
        }
    }

    async fn write(&self, key: &ObjectKey, data: Bytes) -> Result<(), StoreError> {
        let request = StorageRequest::Write {
            group_id: key.group_id().to_string(),
            segment_name: key.segment_name().to_string(),
            data,
        };
        match self.request(&request, Some(key)).await? {
            StorageResponse::Written => Ok(()),
            _ => Err(self.conn.unexpected().into()),
        }
    }

    async fn remove(&self, key: &ObjectKey) -> Result<(), StoreError> {
        let request = StorageRequest::Remove {
            group_id: key.group_id().to_string(),
            segment_name: key.segment_name().to_string(),
        };
        match self.request(&request, Some(key)).await? {
            StorageResponse::Removed => Ok(()),
            _ => Err(self.conn.unexpected().into()),
        }
    }

    async fn list(&self) -> Result<Vec<ObjectKey>, StoreError> {
        match self.request(&StorageRequest::List, None).await? {
            StorageResponse::Keys(composites) => Ok(composites
                .into_iter()
                .filter_map(|composite| match ObjectKey::parse(&composite) {
                    Ok(key) => Some(key),
                    Err(e) => {
                        warn!(address = %self.conn.address(), %composite, error = %e, "dropping unparseable listing entry");
                        None
                    }
                })
                .collect()),
            _ => Err(self.conn.unexpected().into()),
        }
    }

    async fn close(&self) {
        self.conn.close().await;
    }
}

/// Client for a gateway's data and admin surface.
#[derive(Debug)]
pub struct GatewayClient {
    conn: Connection,
}

impl GatewayClient {
    pub async fn connect(address: impl Into<String>, timeouts: Timeouts) -> Result<Self, TransportError> {
        Ok(Self {
            conn: Connection::open(address, timeouts).await?,
        })
    }

    async fn request(&self, request: &GatewayRequest) -> Result<GatewayResponse, TransportError> {
        match self.conn.call::<_, GatewayResponse>(request).await? {
            GatewayResponse::Error(error) => Err(TransportError::Remote {
                address: self.conn.address().to_string(),
                error,
            }),
            response => Ok(response),
        }
    }

    pub async fn read(&self, group_id: &str, segment_name: &str) -> Result<Bytes, TransportError> {
        let request = GatewayRequest::Read {
            group_id: group_id.to_string(),
            segment_name: segment_name.to_string(),
        };
        match self.request(&request).await? {
            GatewayResponse::Data(data) => Ok(data),
            _ => Err(self.conn.unexpected()),
        }
    }

    pub async fn write(&self, group_id: &str, segment_name: &str, data: Bytes) -> Result<(), TransportError> {
        let request = GatewayRequest::Write {
            group_id: group_id.to_string(),
            segment_name: segment_name.to_string(),
            data,
        };
        match self.request(&request).await? {
            GatewayResponse::Written => Ok(()),
            _ => Err(self.conn.unexpected()),
        }
    }

    pub async fn list_nodes(&self) -> Result<Vec<String>, TransportError> {
        match self.request(&GatewayRequest::ListNodes).await? {
            GatewayResponse::Nodes(nodes) => Ok(nodes),
            _ => Err(self.conn.unexpected()),
        }
    }

    pub async fn describe_ring(&self) -> Result<Vec<MemberInfo>, TransportError> {
        match self.request(&GatewayRequest::DescribeRing).await? {
            GatewayResponse::Ring(members) => Ok(members),
            _ => Err(self.conn.unexpected()),
        }
    }

    pub async fn add_node(&self, address: &str) -> Result<MigrationSummary, TransportError> {
        let request = GatewayRequest::AddNode {
            address: address.to_string(),
        };
        match self.request(&request).await? {
            GatewayResponse::Migrated(summary) => Ok(summary),
            _ => Err(self.conn.unexpected()),
        }
    }

    pub async fn remove_node(&self, address: &str) -> Result<MigrationSummary, TransportError> {
        let request = GatewayRequest::RemoveNode {
            address: address.to_string(),
        };
        match self.request(&request).await? {
            GatewayResponse::Migrated(summary) => Ok(summary),
            _ => Err(self.conn.unexpected()),
        }
    }

    pub async fn close(&self) {
        self.conn.close().await;
    }
}

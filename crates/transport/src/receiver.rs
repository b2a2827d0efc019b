//! Server side: accept loop and the storage-node request handler.
//!
//! Every accepted connection runs on its own task and may carry any number
//! of request/response exchanges, one at a time.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use store::{NodeStore, ObjectKey, StoreError};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::codec::{read_frame, write_frame};
use crate::protocol::{ErrorKind, RemoteError, StorageRequest, StorageResponse};

/// Turns one decoded request into one response.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Request: DeserializeOwned + Send + 'static;
    type Response: Serialize + Send + Sync + 'static;

    async fn handle(&self, request: Self::Request) -> Self::Response;
}

/// Accepts connections on `listener` until `shutdown` resolves.
pub async fn serve<H, F>(listener: TcpListener, handler: Arc<H>, shutdown: F) -> io::Result<()>
where
    H: Handler,
    F: Future<Output = ()>,
{
    let local = listener.local_addr()?;
    info!(%local, "listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(%local, "listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(%local, error = %e, "accept error");
                        continue;
                    }
                };
                let handler = Arc::clone(&handler);
                tokio::spawn(serve_connection(stream, peer, handler));
            }
        }
    }
}

async fn serve_connection<H: Handler>(mut stream: TcpStream, peer: SocketAddr, handler: Arc<H>) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "set_nodelay failed");
    }
    loop {
        let request: H::Request = match read_frame(&mut stream).await {
            Ok(request) => request,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!(%peer, "peer closed connection");
                return;
            }
            Err(e) => {
                debug!(%peer, error = %e, "read error");
                return;
            }
        };

        let response = handler.handle(request).await;
        if let Err(e) = write_frame(&mut stream, &response).await {
            debug!(%peer, error = %e, "write error");
            return;
        }
    }
}

/// Serves the storage-node surface from a local [`NodeStore`].
pub struct StoreService {
    store: Arc<dyn NodeStore>,
}

impl StoreService {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self { store }
    }

    async fn dispatch(&self, request: StorageRequest) -> Result<StorageResponse, StoreError> {
        match request {
            StorageRequest::Read {
                group_id,
                segment_name,
            } => {
                let key = ObjectKey::new(group_id, segment_name)?;
                Ok(StorageResponse::Data(self.store.read(&key).await?))
            }
            StorageRequest::Write {
                group_id,
                segment_name,
                data,
            } => {
                let key = ObjectKey::new(group_id, segment_name)?;
                self.store.write(&key, data).await?;
                Ok(StorageResponse::Written)
            }
            StorageRequest::Remove {
                group_id,
                segment_name,
            } => {
                let key = ObjectKey::new(group_id, segment_name)?;
                self.store.remove(&key).await?;
                Ok(StorageResponse::Removed)
            }
            StorageRequest::List => {
                let keys = self.store.list().await?;
                Ok(StorageResponse::Keys(
                    keys.iter().map(ObjectKey::composite).collect(),
                ))
            }
        }
    }
}

#[async_trait]
impl Handler for StoreService {
    type Request = StorageRequest;
    type Response = StorageResponse;

    async fn handle(&self, request: StorageRequest) -> StorageResponse {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                let kind = match &e {
                    StoreError::NotFound(_) => ErrorKind::NotFound,
                    StoreError::InvalidKey(_) => ErrorKind::InvalidKey,
                    _ => {
                        warn!(error = %e, "storage request failed");
                        ErrorKind::Internal
                    }
                };
                StorageResponse::Error(RemoteError::new(kind, e.to_string()))
            }
        }
    }
}

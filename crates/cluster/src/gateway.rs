//! The gateway's RPC surface: routed data access plus administration.

use std::sync::Arc;

use async_trait::async_trait;
use store::ObjectKey;
use tracing::debug;
use transport::{GatewayRequest, GatewayResponse, Handler, RemoteError};

use crate::error::{ClusterError, Result};
use crate::membership::MembershipController;
use crate::router::Router;

pub struct GatewayService {
    controller: Arc<MembershipController>,
    router: Router,
}

impl GatewayService {
    pub fn new(controller: Arc<MembershipController>) -> Self {
        let router = controller.router();
        Self { controller, router }
    }

    async fn dispatch(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        match request {
            GatewayRequest::Read {
                group_id,
                segment_name,
            } => {
                let key = parse_key(group_id, segment_name)?;
                Ok(GatewayResponse::Data(self.router.read(&key).await?))
            }
            GatewayRequest::Write {
                group_id,
                segment_name,
                data,
            } => {
                let key = parse_key(group_id, segment_name)?;
                self.router.write(&key, data).await?;
                Ok(GatewayResponse::Written)
            }
            GatewayRequest::ListNodes => Ok(GatewayResponse::Nodes(self.controller.list_nodes())),
            GatewayRequest::DescribeRing => Ok(GatewayResponse::Ring(self.controller.describe())),
            GatewayRequest::AddNode { address } => {
                let report = self.controller.add_node(&address).await?;
                Ok(GatewayResponse::Migrated(report.summary()))
            }
            GatewayRequest::RemoveNode { address } => {
                let report = self.controller.remove_node(&address).await?;
                Ok(GatewayResponse::Migrated(report.summary()))
            }
        }
    }
}

fn parse_key(group_id: String, segment_name: String) -> Result<ObjectKey> {
    ObjectKey::new(group_id, segment_name).map_err(|e| ClusterError::InvalidKey(e.to_string()))
}

#[async_trait]
impl Handler for GatewayService {
    type Request = GatewayRequest;
    type Response = GatewayResponse;

    async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "gateway request failed");
                GatewayResponse::Error(RemoteError::new(e.kind(), e.to_string()))
            }
        }
    }
}

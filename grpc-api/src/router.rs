//! Leader redirection for the RPC surface.
//!
//! Every write-affecting call must execute on the consensus leader. Each
//! handler asks the router for a forwarding client first; `None` means the
//! local node is the leader and the local handler runs. Otherwise the
//! handler re-issues the identical typed call on the returned client — one
//! hop, no local retry, leader-side errors relayed unmodified.
//!
//! The consensus library advertises the leader's *transport* address; the
//! RPC service listens on its own port, so the host is kept and the port is
//! rewritten to the cluster-wide RPC port.

use std::sync::Arc;

use ledger::consensus::{RaftApi, ServerId};
use tonic::transport::Channel;
use tonic::Status;

use crate::proto::ledger_service_client::LedgerServiceClient;

pub struct LeaderRouter {
    server_id: ServerId,
    raft: Arc<dyn RaftApi>,
    rpc_port: u16,
}

impl LeaderRouter {
    pub fn new(server_id: ServerId, raft: Arc<dyn RaftApi>, rpc_port: u16) -> Self {
        Self {
            server_id,
            raft,
            rpc_port,
        }
    }

    pub fn is_leader(&self) -> bool {
        let (_, leader_id) = self.raft.leader_with_id();
        leader_id == self.server_id
    }

    /// The leader's RPC address, or `None` when this node is the leader.
    pub fn leader_rpc_addr(&self) -> Option<String> {
        let (leader_addr, leader_id) = self.raft.leader_with_id();
        if leader_id == self.server_id {
            return None;
        }
        Some(self.translate(&leader_addr.0))
    }

    /// Connects to the current leader; `None` when this node should handle
    /// the call itself.
    pub async fn leader_client(&self) -> Result<Option<LedgerServiceClient<Channel>>, Status> {
        let Some(addr) = self.leader_rpc_addr() else {
            return Ok(None);
        };
        let client = LedgerServiceClient::connect(format!("http://{addr}"))
            .await
            .map_err(|e| Status::unavailable(format!("failed to connect to leader: {e}")))?;
        Ok(Some(client))
    }

    fn translate(&self, transport_addr: &str) -> String {
        let host = transport_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(transport_addr);
        format!("{host}:{}", self.rpc_port)
    }
}

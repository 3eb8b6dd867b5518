//! gRPC server setup and shared handler context.

use std::sync::Arc;

use ledger::consensus::RaftApi;
use ledger::mempool::TxPool;
use ledger::storage::{BlockchainStore, TransactionStore, UserStore};
use ledger::Transactor;
use slog::Logger;
use tonic::transport::Server;

use crate::config::RpcConfig;
use crate::proto::ledger_service_server::LedgerServiceServer;
use crate::router::LeaderRouter;
use crate::services::LedgerServiceImpl;

/// Everything the service handlers need, built once at node start and
/// shared across requests.
pub struct RpcContext {
    pub transactor: Arc<Transactor>,
    pub raft: Arc<dyn RaftApi>,
    pub tx_store: Arc<dyn TransactionStore>,
    pub blockchain: Arc<dyn BlockchainStore>,
    pub users: Arc<dyn UserStore>,
    pub pool: Arc<TxPool>,
    pub router: LeaderRouter,
    pub logger: Logger,
}

/// gRPC server instance.
pub struct RpcServer {
    config: RpcConfig,
    context: Arc<RpcContext>,
}

impl RpcServer {
    pub fn new(config: RpcConfig, context: Arc<RpcContext>) -> Self {
        Self { config, context }
    }

    /// Start the gRPC server; blocks until it shuts down.
    pub async fn serve(self) -> Result<(), tonic::transport::Error> {
        let addr = self.config.listen_addr;
        slog::info!(self.context.logger, "Starting gRPC server"; "address" => %addr);

        let service = LedgerServiceImpl::new(Arc::clone(&self.context));
        Server::builder()
            .add_service(LedgerServiceServer::new(service))
            .serve(addr)
            .await
    }

    /// Like [`RpcServer::serve`], stopping when `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), tonic::transport::Error>
    where
        F: std::future::Future<Output = ()>,
    {
        let addr = self.config.listen_addr;
        slog::info!(self.context.logger, "Starting gRPC server"; "address" => %addr);

        let service = LedgerServiceImpl::new(Arc::clone(&self.context));
        Server::builder()
            .add_service(LedgerServiceServer::new(service))
            .serve_with_shutdown(addr, shutdown)
            .await
    }
}

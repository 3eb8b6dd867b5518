//! The LedgerService implementation.
//!
//! Every handler follows the same shape: consult the leader router first and
//! forward the identical typed call when this node is not the leader (the
//! explicit per-method dispatch keeps the forwarding compile-time typed),
//! otherwise run the local handler.

use std::sync::Arc;

use ledger::consensus::{RaftApi as _, ServerAddress, ServerId};
use ledger::crypto;
use ledger::storage::{BlockchainStore as _, TransactionStore as _, UserStore as _};
use tonic::{Request, Response, Status};

use crate::error::to_status;
use crate::mapper;
use crate::proto::ledger_service_server::LedgerService;
use crate::proto::{
    AddPeerRequest, AddPeerResponse, AddTransactionRequest, AddTransactionResponse,
    AddUserRequest, AddUserResponse, AddVoterRequest, AddVoterResponse, GetBalanceRequest,
    GetBalanceResponse, GetBlockKeysRequest, GetBlockKeysResponse, GetBlockRequest,
    GetBlockResponse, GetTransactionRequest, GetTransactionResponse, GetUserRequest,
    GetUserResponse, ListUsersRequest, ListUsersResponse, RemovePeerRequest, RemovePeerResponse,
    VerifyTransactionRequest, VerifyTransactionResponse,
};
use crate::server::RpcContext;

pub struct LedgerServiceImpl {
    ctx: Arc<RpcContext>,
}

impl LedgerServiceImpl {
    pub fn new(ctx: Arc<RpcContext>) -> Self {
        Self { ctx }
    }
}

fn require(field: &str, value: &str) -> Result<(), Status> {
    if value.is_empty() {
        return Err(Status::invalid_argument(format!("{field} must be provided")));
    }
    Ok(())
}

#[tonic::async_trait]
impl LedgerService for LedgerServiceImpl {
    async fn add_transaction(
        &self,
        request: Request<AddTransactionRequest>,
    ) -> Result<Response<AddTransactionResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.add_transaction(req).await;
        }

        let sender = crypto::secret_key_from_hex(&req.sender_private_key).map_err(to_status)?;
        let receiver = crypto::public_key_from_hex(&req.receiver_public_key).map_err(to_status)?;
        let amount = mapper::amount_from_proto(req.amount).map_err(Status::from)?;

        let tx = self
            .ctx
            .transactor
            .create_tx(&sender, &receiver, amount)
            .map_err(to_status)?;
        slog::info!(self.ctx.logger, "transaction staged";
            "id" => %tx.id_uuid(),
            "outputs" => tx.outputs.len(),
        );
        Ok(Response::new(AddTransactionResponse {
            transaction: Some(mapper::tx_to_proto(&tx)),
        }))
    }

    async fn get_balance(
        &self,
        request: Request<GetBalanceRequest>,
    ) -> Result<Response<GetBalanceResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.get_balance(req).await;
        }

        let key = crypto::secret_key_from_hex(&req.private_key).map_err(to_status)?;
        let balance = self.ctx.transactor.get_balance(&key).map_err(to_status)?;
        Ok(Response::new(GetBalanceResponse {
            amount: Some(mapper::amount_to_proto(&balance)),
        }))
    }

    async fn get_transaction(
        &self,
        request: Request<GetTransactionRequest>,
    ) -> Result<Response<GetTransactionResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.get_transaction(req).await;
        }

        let id = mapper::tx_id_from_proto(&req.id).map_err(Status::from)?;
        let persisted = self
            .ctx
            .tx_store
            .get_by_id(id.as_bytes())
            .map_err(|e| to_status(ledger::Error::Storage(e)))?;
        // Not yet committed? The pool may still hold it.
        let tx = persisted
            .or_else(|| {
                self.ctx
                    .pool
                    .pending()
                    .into_iter()
                    .find(|tx| tx.id == *id.as_bytes())
            })
            .ok_or_else(|| Status::not_found(format!("transaction {id}")))?;
        Ok(Response::new(GetTransactionResponse {
            transaction: Some(mapper::tx_to_proto(&tx)),
        }))
    }

    async fn verify_transaction(
        &self,
        request: Request<VerifyTransactionRequest>,
    ) -> Result<Response<VerifyTransactionResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.verify_transaction(req).await;
        }

        let id = mapper::tx_id_from_proto(&req.id).map_err(Status::from)?;
        match self.ctx.transactor.verify_tx(id) {
            Ok(tx) => Ok(Response::new(VerifyTransactionResponse {
                transaction: Some(mapper::tx_to_proto(&tx)),
                is_valid: true,
            })),
            Err(ledger::Error::TransactionNotInTree) => {
                let tx = self
                    .ctx
                    .tx_store
                    .get_by_id(id.as_bytes())
                    .map_err(|e| to_status(ledger::Error::Storage(e)))?;
                Ok(Response::new(VerifyTransactionResponse {
                    transaction: tx.as_ref().map(mapper::tx_to_proto),
                    is_valid: false,
                }))
            }
            Err(err) => Err(to_status(err)),
        }
    }

    async fn add_user(
        &self,
        request: Request<AddUserRequest>,
    ) -> Result<Response<AddUserResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.add_user(req).await;
        }

        let user = req
            .user
            .ok_or_else(|| Status::invalid_argument("user must be provided"))?;
        let user = mapper::user_from_proto(user).map_err(Status::from)?;
        // User records stay local to the leader's store; they do not travel
        // through the replicated log.
        self.ctx
            .users
            .put(&user)
            .map_err(|e| to_status(ledger::Error::Storage(e)))?;
        slog::info!(self.ctx.logger, "user added"; "username" => %user.username);
        Ok(Response::new(AddUserResponse { success: true }))
    }

    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<GetUserResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.get_user(req).await;
        }

        require("username", &req.username)?;
        let user = self
            .ctx
            .users
            .get(&req.username)
            .map_err(|e| to_status(ledger::Error::Storage(e)))?
            .ok_or_else(|| Status::not_found(format!("user {}", req.username)))?;
        Ok(Response::new(GetUserResponse {
            user: Some(mapper::user_to_proto(&user)),
        }))
    }

    async fn list_users(
        &self,
        request: Request<ListUsersRequest>,
    ) -> Result<Response<ListUsersResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.list_users(req).await;
        }

        let users = self
            .ctx
            .users
            .get_all()
            .map_err(|e| to_status(ledger::Error::Storage(e)))?;
        Ok(Response::new(ListUsersResponse {
            users: users.iter().map(mapper::user_to_proto).collect(),
        }))
    }

    async fn add_peer(
        &self,
        request: Request<AddPeerRequest>,
    ) -> Result<Response<AddPeerResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.add_peer(req).await;
        }

        require("peer id", &req.id)?;
        require("peer address", &req.address)?;
        self.ctx
            .raft
            .add_nonvoter(ServerId(req.id), ServerAddress(req.address))
            .map_err(to_status)?;
        Ok(Response::new(AddPeerResponse { success: true }))
    }

    async fn remove_peer(
        &self,
        request: Request<RemovePeerRequest>,
    ) -> Result<Response<RemovePeerResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.remove_peer(req).await;
        }

        require("peer id", &req.id)?;
        self.ctx
            .raft
            .remove_server(ServerId(req.id))
            .map_err(to_status)?;
        Ok(Response::new(RemovePeerResponse { success: true }))
    }

    async fn add_voter(
        &self,
        request: Request<AddVoterRequest>,
    ) -> Result<Response<AddVoterResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.add_voter(req).await;
        }

        require("voter id", &req.id)?;
        require("voter address", &req.address)?;
        self.ctx
            .raft
            .add_voter(ServerId(req.id), ServerAddress(req.address))
            .map_err(to_status)?;
        Ok(Response::new(AddVoterResponse { success: true }))
    }

    async fn get_block_keys(
        &self,
        request: Request<GetBlockKeysRequest>,
    ) -> Result<Response<GetBlockKeysResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.get_block_keys(req).await;
        }

        let timestamps = self
            .ctx
            .blockchain
            .keys()
            .map_err(|e| to_status(ledger::Error::Storage(e)))?;
        Ok(Response::new(GetBlockKeysResponse { timestamps }))
    }

    async fn get_block(
        &self,
        request: Request<GetBlockRequest>,
    ) -> Result<Response<GetBlockResponse>, Status> {
        let req = request.into_inner();
        if let Some(mut client) = self.ctx.router.leader_client().await? {
            return client.get_block(req).await;
        }

        let block = self
            .ctx
            .blockchain
            .get_by_timestamp(req.timestamp)
            .map_err(|e| to_status(ledger::Error::Storage(e)))?
            .ok_or_else(|| Status::not_found(format!("block {}", req.timestamp)))?;
        Ok(Response::new(GetBlockResponse {
            block: Some(mapper::block_to_proto(&block)),
        }))
    }
}

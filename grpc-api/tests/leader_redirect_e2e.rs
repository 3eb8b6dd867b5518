//! End-to-end leader redirection.
//!
//! Spins up two in-process nodes: a leader running the real single-voter
//! engine and a follower whose consensus view points at the leader. Calls
//! issued to the follower must land on the leader and the leader's
//! responses — including its validation errors — must come back unmodified.

use std::sync::Arc;
use std::time::Duration;

use grpc_api::proto::ledger_service_client::LedgerServiceClient;
use grpc_api::proto::{
    AddUserRequest, GetBalanceRequest, GetBlockKeysRequest, GetUserRequest, User as ProtoUser,
};
use grpc_api::{LeaderRouter, RpcConfig, RpcContext, RpcServer};
use ledger::consensus::fsm::Fsm;
use ledger::consensus::local::LocalRaft;
use ledger::consensus::{RaftApi, ServerAddress, ServerId};
use ledger::mempool::TxPool;
use ledger::state::block::Block;
use ledger::storage::{BlockchainStore, LedgerStore};
use ledger::{Error, Transactor};
use tokio::sync::Notify;
use tonic::transport::Channel;

const LEADER_TRANSPORT: &str = "127.0.0.1:57801";
const LEADER_ID: &str = "leader";
const LEADER_RPC_PORT: u16 = 57811;
const FOLLOWER_RPC_PORT: u16 = 57812;

/// Consensus view of a replica that is not the leader: it knows who the
/// leader is and refuses log submissions of its own.
struct FollowerRaft;

impl RaftApi for FollowerRaft {
    fn apply(&self, _: Vec<u8>, _: Duration) -> Result<(), Error> {
        Err(Error::Consensus("node is not the leader".into()))
    }

    fn leader_with_id(&self) -> (ServerAddress, ServerId) {
        (
            ServerAddress(LEADER_TRANSPORT.into()),
            ServerId(LEADER_ID.into()),
        )
    }

    fn add_voter(&self, _: ServerId, _: ServerAddress) -> Result<(), Error> {
        Err(Error::Consensus("node is not the leader".into()))
    }

    fn add_nonvoter(&self, _: ServerId, _: ServerAddress) -> Result<(), Error> {
        Err(Error::Consensus("node is not the leader".into()))
    }

    fn remove_server(&self, _: ServerId) -> Result<(), Error> {
        Err(Error::Consensus("node is not the leader".into()))
    }
}

fn test_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}

fn build_node(node_id: &str, dir: &std::path::Path, raft: Arc<dyn RaftApi>) -> Arc<RpcContext> {
    let store = Arc::new(LedgerStore::open(dir.join(format!("{node_id}.redb"))).unwrap());
    let pool = Arc::new(TxPool::new());

    let tx_store: Arc<dyn ledger::storage::TransactionStore> = Arc::new(store.transactions());
    let utxo_store: Arc<dyn ledger::storage::UtxoStore> = Arc::new(store.utxos());
    let blockchain: Arc<dyn BlockchainStore> = Arc::new(store.blockchain());
    let block_txs: Arc<dyn ledger::storage::BlockTransactionsStore> =
        Arc::new(store.block_transactions());
    let users: Arc<dyn ledger::storage::UserStore> = Arc::new(store.users());

    let transactor = Arc::new(Transactor::new(
        Arc::clone(&tx_store),
        utxo_store,
        Arc::clone(&blockchain),
        block_txs,
        Arc::clone(&pool),
    ));
    // Both nodes forward to the cluster-wide RPC port of the leader.
    let router = LeaderRouter::new(ServerId(node_id.into()), Arc::clone(&raft), LEADER_RPC_PORT);

    if node_id == LEADER_ID {
        store.blockchain().put(&Block::genesis()).unwrap();
    }

    Arc::new(RpcContext {
        transactor,
        raft,
        tx_store,
        blockchain,
        users,
        pool,
        router,
        logger: test_logger(),
    })
}

fn spawn_server(context: Arc<RpcContext>, port: u16, shutdown: Arc<Notify>) {
    let config = RpcConfig {
        listen_addr: format!("127.0.0.1:{port}").parse().unwrap(),
        leader_rpc_port: LEADER_RPC_PORT,
        ..RpcConfig::default()
    };
    let server = RpcServer::new(config, context);
    tokio::spawn(async move {
        server
            .serve_with_shutdown(async move {
                shutdown.notified().await;
            })
            .await
            .unwrap();
    });
}

async fn connect(port: u16) -> LedgerServiceClient<Channel> {
    for _ in 0..50 {
        if let Ok(client) = LedgerServiceClient::connect(format!("http://127.0.0.1:{port}")).await
        {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("server on port {port} did not come up");
}

#[tokio::test]
async fn follower_forwards_calls_to_the_leader() {
    let dir = tempfile::tempdir().unwrap();
    let shutdown = Arc::new(Notify::new());

    // Leader: real single-voter engine over its own store.
    let leader_store = Arc::new(LedgerStore::open(dir.path().join("leader-fsm.redb")).unwrap());
    let leader_pool = Arc::new(TxPool::new());
    let leader_raft: Arc<dyn RaftApi> = Arc::new(LocalRaft::new(
        ServerId(LEADER_ID.into()),
        ServerAddress(LEADER_TRANSPORT.into()),
        Box::new(Fsm::new(leader_store, leader_pool, test_logger())),
    ));
    let leader_ctx = build_node(LEADER_ID, dir.path(), leader_raft);
    spawn_server(Arc::clone(&leader_ctx), LEADER_RPC_PORT, Arc::clone(&shutdown));

    // Follower: different id, consensus view pointing at the leader.
    let follower_ctx = build_node("follower", dir.path(), Arc::new(FollowerRaft));
    spawn_server(follower_ctx, FOLLOWER_RPC_PORT, Arc::clone(&shutdown));

    let mut follower = connect(FOLLOWER_RPC_PORT).await;
    let mut leader = connect(LEADER_RPC_PORT).await;

    // A write issued to the follower lands in the leader's store.
    follower
        .add_user(AddUserRequest {
            user: Some(ProtoUser {
                username: "alice".into(),
                public_key: "02ab".into(),
                private_key: "cd".into(),
            }),
        })
        .await
        .expect("forwarded add_user should succeed");

    let fetched = leader
        .get_user(GetUserRequest {
            username: "alice".into(),
        })
        .await
        .expect("user must exist on the leader")
        .into_inner();
    assert_eq!(fetched.user.unwrap().username, "alice");

    // Leader-side state is readable through the follower.
    let keys = follower
        .get_block_keys(GetBlockKeysRequest {})
        .await
        .unwrap()
        .into_inner();
    assert_eq!(keys.timestamps, vec![0]);

    // Leader-side validation errors come back through the follower as-is.
    let err = follower
        .get_balance(GetBalanceRequest {
            private_key: "not hex at all".into(),
        })
        .await
        .expect_err("malformed key must be rejected by the leader");
    assert_eq!(err.code(), tonic::Code::InvalidArgument);

    shutdown.notify_waiters();
}

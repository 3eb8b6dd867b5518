//! tally node: wires storage, pool, transactor, consensus and the RPC
//! surface together and runs the block scheduler alongside the gRPC server.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use slog::{o, Drain, Logger};
use tokio::sync::Notify;

use grpc_api::{LeaderRouter, RpcConfig, RpcContext, RpcServer};
use ledger::chain::Chain;
use ledger::consensus::fsm::Fsm;
use ledger::consensus::local::LocalRaft;
use ledger::consensus::scheduler::BlockScheduler;
use ledger::consensus::{RaftApi, ServerAddress, ServerId};
use ledger::mempool::TxPool;
use ledger::storage::{
    BlockTransactionsStore, BlockchainStore, LedgerStore, TransactionStore, UserStore, UtxoStore,
};
use ledger::Transactor;

mod genesis;

#[derive(Parser, Debug)]
#[command(name = "tally-node", about = "Permissioned UTXO ledger node")]
struct Args {
    /// Consensus transport address of this node
    #[arg(long, default_value = "127.0.0.1:8001")]
    address: String,

    /// gRPC listen port
    #[arg(long, default_value_t = 9001)]
    rpc_port: u16,

    /// Data directory
    #[arg(long, default_value = "./db")]
    data_dir: PathBuf,

    /// Node id used by consensus
    #[arg(long, default_value = "node-1")]
    node_id: String,

    /// Write the genesis block and mint the initial emission
    #[arg(long)]
    bootstrap: bool,

    /// Seconds between block assemblies
    #[arg(long, default_value_t = 10)]
    block_interval_secs: u64,
}

fn root_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("service" => "tally-node"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let logger = root_logger();

    std::fs::create_dir_all(&args.data_dir)?;
    let store = Arc::new(LedgerStore::open(args.data_dir.join("ledger.redb"))?);
    let pool = Arc::new(TxPool::new());

    let tx_store: Arc<dyn TransactionStore> = Arc::new(store.transactions());
    let utxo_store: Arc<dyn UtxoStore> = Arc::new(store.utxos());
    let blockchain: Arc<dyn BlockchainStore> = Arc::new(store.blockchain());
    let block_txs: Arc<dyn BlockTransactionsStore> = Arc::new(store.block_transactions());
    let users: Arc<dyn UserStore> = Arc::new(store.users());

    let server_id = ServerId(args.node_id.clone());
    let fsm = Fsm::new(
        Arc::clone(&store),
        Arc::clone(&pool),
        logger.new(o!("component" => "fsm")),
    );
    let raft: Arc<dyn RaftApi> = Arc::new(LocalRaft::new(
        server_id.clone(),
        ServerAddress(args.address.clone()),
        Box::new(fsm),
    ));

    if args.bootstrap {
        genesis::bootstrap(&store, &logger.new(o!("component" => "bootstrap")))?;
    }

    let transactor = Arc::new(Transactor::new(
        Arc::clone(&tx_store),
        utxo_store,
        Arc::clone(&blockchain),
        block_txs,
        Arc::clone(&pool),
    ));

    let chain = Arc::new(Chain::new(
        Arc::clone(&raft),
        server_id.clone(),
        Arc::clone(&blockchain),
        Arc::clone(&pool),
        logger.new(o!("component" => "chain")),
    ));
    let scheduler = BlockScheduler::new(chain, logger.new(o!("component" => "scheduler")))
        .with_interval(Duration::from_secs(args.block_interval_secs));

    let shutdown = Arc::new(Notify::new());
    let scheduler_shutdown = Arc::clone(&shutdown);
    let mut scheduler_handle = tokio::spawn(scheduler.run(scheduler_shutdown));

    let rpc_config = RpcConfig {
        listen_addr: format!("0.0.0.0:{}", args.rpc_port).parse()?,
        leader_rpc_port: args.rpc_port,
        ..RpcConfig::default()
    };
    let router = LeaderRouter::new(server_id, Arc::clone(&raft), args.rpc_port);
    let context = Arc::new(RpcContext {
        transactor,
        raft,
        tx_store,
        blockchain,
        users,
        pool,
        router,
        logger: logger.new(o!("component" => "rpc")),
    });
    let server = RpcServer::new(rpc_config, context);

    let server_shutdown = Arc::clone(&shutdown);
    let server_handle = tokio::spawn(async move {
        server
            .serve_with_shutdown(async move {
                server_shutdown.notified().await;
            })
            .await
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            slog::info!(logger, "shutdown signal received");
            shutdown.notify_waiters();
            if let Ok(Err(err)) = scheduler_handle.await {
                slog::error!(logger, "block scheduler failed during shutdown"; "error" => %err);
            }
        }
        result = &mut scheduler_handle => {
            // The scheduler only stops on its own when the error threshold
            // is hit; take the node down with it.
            if let Ok(Err(err)) = result {
                slog::error!(logger, "block scheduler stopped"; "error" => %err);
            }
            shutdown.notify_waiters();
        }
    }

    server_handle.await??;
    slog::info!(logger, "node stopped");
    Ok(())
}

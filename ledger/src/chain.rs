//! Block proposal: drains the pool into a block and submits it through the
//! consensus log.

use std::sync::Arc;
use std::time::Duration;

use slog::Logger;

use crate::consensus::{RaftApi, ServerId};
use crate::error::Error;
use crate::mempool::TxPool;
use crate::merkle::MerkleTree;
use crate::state::block::{Block, BlockTxs};
use crate::state::envelope::Envelope;
use crate::storage::BlockchainStore;

/// How long a proposal waits for consensus commit.
pub const DEFAULT_APPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// Anything the scheduler can ask to assemble a block.
pub trait BlockProposer: Send + Sync {
    /// Assembles and submits one block. A no-op (not an error) when this
    /// node is not the leader or there is nothing pending.
    fn propose_block(&self) -> Result<(), Error>;
}

/// The replicated ledger's proposer side.
///
/// Proposal only submits to the log; persistence belongs exclusively to the
/// state-machine apply handler, because only committed entries are durable.
pub struct Chain {
    raft: Arc<dyn RaftApi>,
    server_id: ServerId,
    blockchain_store: Arc<dyn BlockchainStore>,
    pool: Arc<TxPool>,
    apply_timeout: Duration,
    logger: Logger,
}

impl Chain {
    pub fn new(
        raft: Arc<dyn RaftApi>,
        server_id: ServerId,
        blockchain_store: Arc<dyn BlockchainStore>,
        pool: Arc<TxPool>,
        logger: Logger,
    ) -> Self {
        Self {
            raft,
            server_id,
            blockchain_store,
            pool,
            apply_timeout: DEFAULT_APPLY_TIMEOUT,
            logger,
        }
    }

    pub fn with_apply_timeout(mut self, timeout: Duration) -> Self {
        self.apply_timeout = timeout;
        self
    }
}

impl BlockProposer for Chain {
    fn propose_block(&self) -> Result<(), Error> {
        let (_, leader_id) = self.raft.leader_with_id();
        if leader_id != self.server_id {
            return Ok(());
        }

        let mut txs = self.pool.pending();
        if txs.is_empty() {
            return Ok(());
        }
        // Stable leaf order for a given pool content; replicas persist the
        // envelope's order verbatim and never rebuild the tree on apply.
        txs.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.hash.cmp(&b.hash))
        });

        let tree = MerkleTree::build(&txs)?;
        let prev_hash = match self.blockchain_store.latest()? {
            Some(prev) => prev.compute_hash(),
            None => Vec::new(),
        };
        let block = Block::new(prev_hash, tree.root().to_vec());

        slog::debug!(self.logger, "proposing block";
            "timestamp" => block.timestamp,
            "transactions" => txs.len(),
        );

        let entry = Envelope::Block(BlockTxs { block, txs }).to_bytes()?;
        self.raft.apply(entry, self.apply_timeout)
    }
}

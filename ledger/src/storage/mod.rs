//! Persistence: store traits and their redb implementation.
//!
//! The traits are the seams consumed by the transactor, the chain and the
//! FSM; tests substitute in-memory fakes. Only the state-machine apply
//! handler writes blocks, transactions and UTXOs — user records are written
//! directly, outside consensus.

pub mod codec;
pub mod store;
pub mod tables;

use anyhow::Result;

use crate::state::block::Block;
use crate::state::transaction::{Transaction, Utxo};
use crate::state::user::User;

pub use store::LedgerStore;

/// Persisted transactions, keyed by hash with a UUID lookup index.
pub trait TransactionStore: Send + Sync {
    fn get_by_id(&self, id: &[u8; 16]) -> Result<Option<Transaction>>;
    fn get_by_hash(&self, hash: &[u8]) -> Result<Option<Transaction>>;
    fn put(&self, tx: &Transaction) -> Result<()>;
}

/// Confirmed unspent outputs per owner key. `put` replaces the owner's set
/// wholesale.
pub trait UtxoStore: Send + Sync {
    fn get(&self, pub_key: &[u8]) -> Result<Vec<Utxo>>;
    fn put(&self, pub_key: &[u8], utxos: &[Utxo]) -> Result<()>;
}

/// The block chain, keyed by block timestamp.
pub trait BlockchainStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<Block>>;
    fn get_by_timestamp(&self, timestamp: u64) -> Result<Option<Block>>;
    /// The block with the highest timestamp, if any.
    fn latest(&self) -> Result<Option<Block>>;
    /// Fails if a block with the same timestamp already exists — blocks are
    /// append-only and a collision is a programming error.
    fn put(&self, block: &Block) -> Result<()>;
    fn delete_all(&self) -> Result<()>;
    fn keys(&self) -> Result<Vec<u64>>;
}

/// The ordered transaction set of each committed block.
pub trait BlockTransactionsStore: Send + Sync {
    fn get_by_block_timestamp(&self, timestamp: u64) -> Result<Option<Vec<Transaction>>>;
    fn put(&self, block_timestamp: u64, txs: &[Transaction]) -> Result<()>;
}

/// Identity records.
pub trait UserStore: Send + Sync {
    fn get_all(&self) -> Result<Vec<User>>;
    fn get(&self, username: &str) -> Result<Option<User>>;
    fn put(&self, user: &User) -> Result<()>;
}

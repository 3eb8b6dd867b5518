//! redb-backed persistence.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use redb::{Database, ReadableTable};

use crate::state::block::Block;
use crate::state::transaction::{Transaction, Utxo};
use crate::state::user::User;
use crate::storage::codec;
use crate::storage::tables::{BLOCKS, BLOCK_TRANSACTIONS, TRANSACTIONS, TX_BY_ID, USERS, UTXOS};
use crate::storage::{
    BlockTransactionsStore, BlockchainStore, TransactionStore, UserStore, UtxoStore,
};

/// Handle to the node's database; hands out per-table stores sharing the
/// same underlying redb instance.
pub struct LedgerStore {
    db: Arc<Database>,
}

impl LedgerStore {
    /// Opens (or creates) a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = if path.as_ref().exists() {
            Database::open(path).context("Failed to open database")?
        } else {
            Database::create(path).context("Failed to create database")?
        };
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            write_txn
                .open_table(TRANSACTIONS)
                .context("Failed to open transactions table")?;
            write_txn
                .open_table(TX_BY_ID)
                .context("Failed to open tx_by_id table")?;
            write_txn
                .open_table(UTXOS)
                .context("Failed to open utxos table")?;
            write_txn
                .open_table(BLOCKS)
                .context("Failed to open blocks table")?;
            write_txn
                .open_table(BLOCK_TRANSACTIONS)
                .context("Failed to open block_transactions table")?;
            write_txn
                .open_table(USERS)
                .context("Failed to open users table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")
    }

    pub fn transactions(&self) -> Transactions {
        Transactions {
            db: Arc::clone(&self.db),
        }
    }

    pub fn utxos(&self) -> Utxos {
        Utxos {
            db: Arc::clone(&self.db),
        }
    }

    pub fn blockchain(&self) -> Blocks {
        Blocks {
            db: Arc::clone(&self.db),
        }
    }

    pub fn block_transactions(&self) -> BlockTransactions {
        BlockTransactions {
            db: Arc::clone(&self.db),
        }
    }

    pub fn users(&self) -> Users {
        Users {
            db: Arc::clone(&self.db),
        }
    }
}

pub struct Transactions {
    db: Arc<Database>,
}

impl TransactionStore for Transactions {
    fn get_by_id(&self, id: &[u8; 16]) -> Result<Option<Transaction>> {
        let hash = {
            let read = self.db.begin_read()?;
            let index = read.open_table(TX_BY_ID)?;
            index.get(id.as_slice())?.map(|row| row.value().to_vec())
        };
        match hash {
            Some(hash) => self.get_by_hash(&hash),
            None => Ok(None),
        }
    }

    fn get_by_hash(&self, hash: &[u8]) -> Result<Option<Transaction>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(TRANSACTIONS)?;
        match table.get(hash)? {
            Some(row) => Ok(Some(codec::decode(row.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, tx: &Transaction) -> Result<()> {
        let bytes = codec::encode(tx)?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(TRANSACTIONS)
                .context("Failed to open transactions table")?;
            table
                .insert(tx.hash.as_slice(), bytes.as_slice())
                .context("Failed to insert transaction")?;
            let mut index = write_txn
                .open_table(TX_BY_ID)
                .context("Failed to open tx_by_id table")?;
            index
                .insert(tx.id.as_slice(), tx.hash.as_slice())
                .context("Failed to insert transaction id index")?;
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")
    }
}

pub struct Utxos {
    db: Arc<Database>,
}

impl UtxoStore for Utxos {
    fn get(&self, pub_key: &[u8]) -> Result<Vec<Utxo>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(UTXOS)?;
        match table.get(pub_key)? {
            Some(row) => codec::decode(row.value()),
            None => Ok(Vec::new()),
        }
    }

    fn put(&self, pub_key: &[u8], utxos: &[Utxo]) -> Result<()> {
        let bytes = codec::encode(&utxos.to_vec())?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(UTXOS)
                .context("Failed to open utxos table")?;
            table
                .insert(pub_key, bytes.as_slice())
                .context("Failed to insert utxos")?;
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")
    }
}

pub struct Blocks {
    db: Arc<Database>,
}

impl BlockchainStore for Blocks {
    fn get_all(&self) -> Result<Vec<Block>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(BLOCKS)?;
        let mut blocks = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            blocks.push(codec::decode(value.value())?);
        }
        Ok(blocks)
    }

    fn get_by_timestamp(&self, timestamp: u64) -> Result<Option<Block>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(BLOCKS)?;
        match table.get(timestamp.to_be_bytes().as_slice())? {
            Some(row) => Ok(Some(codec::decode(row.value())?)),
            None => Ok(None),
        }
    }

    fn latest(&self) -> Result<Option<Block>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(BLOCKS)?;
        let result = match table.iter()?.next_back() {
            Some(row) => {
                let (_, value) = row?;
                Some(codec::decode(value.value())?)
            }
            None => None,
        };
        Ok(result)
    }

    fn put(&self, block: &Block) -> Result<()> {
        if self.get_by_timestamp(block.timestamp)?.is_some() {
            anyhow::bail!("block with timestamp {} already exists", block.timestamp);
        }
        let bytes = codec::encode(block)?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(BLOCKS)
                .context("Failed to open blocks table")?;
            table
                .insert(block.timestamp.to_be_bytes().as_slice(), bytes.as_slice())
                .context("Failed to insert block")?;
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")
    }

    fn delete_all(&self) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        write_txn
            .delete_table(BLOCKS)
            .context("Failed to delete blocks table")?;
        write_txn
            .open_table(BLOCKS)
            .context("Failed to recreate blocks table")?;
        write_txn
            .commit()
            .context("Failed to commit write transaction")
    }

    fn keys(&self) -> Result<Vec<u64>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(BLOCKS)?;
        let mut keys = Vec::new();
        for row in table.iter()? {
            let (key, _) = row?;
            let bytes: [u8; 8] = key
                .value()
                .try_into()
                .map_err(|_| anyhow::anyhow!("malformed block key"))?;
            keys.push(u64::from_be_bytes(bytes));
        }
        Ok(keys)
    }
}

pub struct BlockTransactions {
    db: Arc<Database>,
}

impl BlockTransactionsStore for BlockTransactions {
    fn get_by_block_timestamp(&self, timestamp: u64) -> Result<Option<Vec<Transaction>>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(BLOCK_TRANSACTIONS)?;
        match table.get(timestamp.to_be_bytes().as_slice())? {
            Some(row) => Ok(Some(codec::decode(row.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, block_timestamp: u64, txs: &[Transaction]) -> Result<()> {
        let bytes = codec::encode(&txs.to_vec())?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(BLOCK_TRANSACTIONS)
                .context("Failed to open block_transactions table")?;
            table
                .insert(block_timestamp.to_be_bytes().as_slice(), bytes.as_slice())
                .context("Failed to insert block transactions")?;
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")
    }
}

pub struct Users {
    db: Arc<Database>,
}

impl UserStore for Users {
    fn get_all(&self) -> Result<Vec<User>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(USERS)?;
        let mut users = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            users.push(codec::decode(value.value())?);
        }
        Ok(users)
    }

    fn get(&self, username: &str) -> Result<Option<User>> {
        let read = self.db.begin_read()?;
        let table = read.open_table(USERS)?;
        match table.get(username)? {
            Some(row) => Ok(Some(codec::decode(row.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, user: &User) -> Result<()> {
        let bytes = codec::encode(user)?;
        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(USERS)
                .context("Failed to open users table")?;
            table
                .insert(user.username.as_str(), bytes.as_slice())
                .context("Failed to insert user")?;
        }
        write_txn
            .commit()
            .context("Failed to commit write transaction")
    }
}

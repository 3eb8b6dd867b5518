//! Transaction pool shared by every request handler on a node.
//!
//! The pool is the sole source of truth for "has this output already been
//! spent by a pending transaction". Alongside the pending transactions it
//! keeps a provisional UTXO overlay:
//!
//! - an output at index 0 (payment to the receiver) *accumulates* under the
//!   recipient's key;
//! - an output at a non-zero index (the sender's change) *replaces* any
//!   earlier pending change for that owner, dropping the stale entry, so a
//!   second transaction can never spend not-yet-confirmed change twice.
//!
//! A single mutex guards all state; every operation is a short critical
//! section. [`TxPool::purge`] is called exactly once per committed block, by
//! the state-machine apply handler — never by the proposer — so the pool
//! only empties after the block is durable.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::state::transaction::{Transaction, Utxo};

#[derive(Default)]
struct PoolInner {
    /// Pending transactions keyed by hash.
    pool: HashMap<Vec<u8>, Transaction>,
    /// Provisional UTXOs keyed by owner public key.
    utxos: HashMap<Vec<u8>, Vec<Utxo>>,
}

/// Mutex-guarded mempool.
#[derive(Default)]
pub struct TxPool {
    inner: Mutex<PoolInner>,
}

impl TxPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a transaction and registers its outputs as provisional UTXOs.
    pub fn add_tx(&self, tx: Transaction) {
        let mut inner = self.lock();
        for (index, out) in tx.outputs.iter().enumerate() {
            let utxo = Utxo {
                tx_hash: tx.hash.clone(),
                index: index as u32,
            };
            let owned = inner.utxos.entry(out.pub_key.clone()).or_default();
            if index > 0 {
                // Fresh change supersedes any pending change for this owner.
                owned.retain(|u| u.index == 0);
            }
            owned.push(utxo);
        }
        inner.pool.insert(tx.hash.clone(), tx);
    }

    /// The pool's view of unspent outputs for an owner.
    pub fn get_utxos(&self, pub_key: &[u8]) -> Vec<Utxo> {
        self.lock().utxos.get(pub_key).cloned().unwrap_or_default()
    }

    /// Looks up a pending transaction by hash.
    pub fn get(&self, tx_hash: &[u8]) -> Option<Transaction> {
        self.lock().pool.get(tx_hash).cloned()
    }

    /// Snapshot of the full pending set.
    pub fn pending(&self) -> Vec<Transaction> {
        self.lock().pool.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pool.is_empty()
    }

    /// Clears the transaction map and the UTXO overlay.
    pub fn purge(&self) {
        let mut inner = self.lock();
        inner.pool.clear();
        inner.utxos.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        // A poisoned lock means a panic mid-section; the data is a cache of
        // pending work and stays usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

//! Transaction construction, balances and inclusion verification.
//!
//! The transactor is the only component that mints transactions or computes
//! balances. Proof of ownership is the ability to sign: a referenced output
//! can be consumed only by producing an ECDSA signature over its
//! transaction's hash with the key matching the output's public key —
//! without the private key the inputs cannot be signed.
//!
//! Balance computation and transaction construction share one gathering
//! path, so a transaction is never built against a balance view inconsistent
//! with what [`Transactor::get_balance`] would report.

use std::sync::Arc;

use secp256k1::{PublicKey, SecretKey};
use uuid::Uuid;

use crate::crypto;
use crate::error::Error;
use crate::mempool::TxPool;
use crate::merkle::MerkleTree;
use crate::state::transaction::{Amount, Transaction, TxIn, Utxo};
use crate::storage::{BlockTransactionsStore, BlockchainStore, TransactionStore, UtxoStore};

pub struct Transactor {
    tx_store: Arc<dyn TransactionStore>,
    utxo_store: Arc<dyn UtxoStore>,
    blockchain_store: Arc<dyn BlockchainStore>,
    block_txs_store: Arc<dyn BlockTransactionsStore>,
    pool: Arc<TxPool>,
}

impl Transactor {
    pub fn new(
        tx_store: Arc<dyn TransactionStore>,
        utxo_store: Arc<dyn UtxoStore>,
        blockchain_store: Arc<dyn BlockchainStore>,
        block_txs_store: Arc<dyn BlockTransactionsStore>,
        pool: Arc<TxPool>,
    ) -> Self {
        Self {
            tx_store,
            utxo_store,
            blockchain_store,
            block_txs_store,
            pool,
        }
    }

    /// Builds a transaction paying `amount` from `sender` to `receiver` and
    /// stages it in the pool.
    ///
    /// Every spendable output of the sender is consumed; the remainder, if
    /// any, comes back as a change output to the sender. No change output is
    /// created when the amounts match exactly.
    pub fn create_tx(
        &self,
        sender: &SecretKey,
        receiver: &PublicKey,
        amount: Amount,
    ) -> Result<Transaction, Error> {
        let mut inputs = Vec::new();
        let balance = self.gather(sender, Some(&mut inputs))?;

        if balance.value < amount.value {
            return Err(Error::InsufficientBalance {
                have: balance.value,
                need: amount.value,
            });
        }

        let mut tx = Transaction::new();
        tx.inputs = inputs;
        tx.add_output(amount, crypto::public_key_bytes(receiver));
        if balance.value > amount.value {
            let change = Amount {
                value: balance.value - amount.value,
                unit: balance.unit,
            };
            let sender_pub = crypto::public_key_of(sender);
            tx.add_output(change, crypto::public_key_bytes(&sender_pub));
        }
        tx.finalize_hash();

        self.pool.add_tx(tx.clone());
        Ok(tx)
    }

    /// Sums the sender's spendable outputs.
    pub fn get_balance(&self, key: &SecretKey) -> Result<Amount, Error> {
        self.gather(key, None)
    }

    /// Loads a persisted transaction and proves its inclusion in the block
    /// it claims to belong to.
    pub fn verify_tx(&self, id: Uuid) -> Result<Transaction, Error> {
        let tx = self
            .tx_store
            .get_by_id(id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("transaction {id}")))?;
        if tx.block_timestamp == 0 {
            return Err(Error::TransactionNotInTree);
        }

        let block = self
            .blockchain_store
            .get_by_timestamp(tx.block_timestamp)?
            .ok_or_else(|| Error::NotFound(format!("block {}", tx.block_timestamp)))?;
        let txs = self
            .block_txs_store
            .get_by_block_timestamp(tx.block_timestamp)?
            .ok_or_else(|| {
                Error::NotFound(format!("transactions of block {}", tx.block_timestamp))
            })?;

        let tree = MerkleTree::build(&txs)?;
        // A rebuilt tree proves nothing unless it commits to what the block
        // committed to.
        if tree.root() != block.merkle_root.as_slice() {
            return Err(Error::TransactionNotInTree);
        }
        if tree.verify_inclusion(&tx)? {
            Ok(tx)
        } else {
            Err(Error::TransactionNotInTree)
        }
    }

    /// Walks the sender's spendable outputs: ownership check, signature,
    /// self-verification, balance accumulation. When `collect` is given,
    /// each output additionally becomes a signed input for a new transaction.
    fn gather(
        &self,
        key: &SecretKey,
        mut collect: Option<&mut Vec<TxIn>>,
    ) -> Result<Amount, Error> {
        let public = crypto::public_key_of(key);
        let pub_key = crypto::public_key_bytes(&public);
        let utxos = self.spendable_utxos(&pub_key)?;

        let mut balance = Amount::zero();
        for (sequence, utxo) in utxos.iter().enumerate() {
            let tx = self.resolve_tx(&utxo.tx_hash)?;
            let output = tx.outputs.get(utxo.index as usize).ok_or_else(|| {
                Error::NotFound(format!(
                    "UTXO index {} is out of bounds for transaction {}",
                    utxo.index,
                    hex::encode(&utxo.tx_hash)
                ))
            })?;

            if output.pub_key != pub_key {
                return Err(Error::NotOwner {
                    tx_hash: hex::encode(&utxo.tx_hash),
                });
            }

            let (r, s) = utxo.sign(key);
            if !utxo.verify(&public, &r, &s) {
                return Err(Error::Signature {
                    tx_hash: hex::encode(&utxo.tx_hash),
                });
            }

            if let Some(inputs) = collect.as_mut() {
                inputs.push(TxIn {
                    prev: utxo.clone(),
                    pub_key: pub_key.clone(),
                    signature_r: r,
                    signature_s: s,
                    n_sequence: sequence as u32,
                });
            }

            balance.value += output.amount.value;
            // Outputs of one owner share a display unit.
            balance.unit = output.amount.unit;
        }
        Ok(balance)
    }

    /// Merges the persisted UTXO set with the pool overlay.
    ///
    /// Pending receiver outputs (index 0) extend the set. A pending change
    /// output means the sender's confirmed outputs are already consumed by
    /// an in-flight transaction, so the change becomes the *only* spendable
    /// output — this is what stops pending change from being spent twice.
    fn spendable_utxos(&self, pub_key: &[u8]) -> Result<Vec<Utxo>, Error> {
        let mut utxos = self.utxo_store.get(pub_key)?;
        let mut change = None;
        for utxo in self.pool.get_utxos(pub_key) {
            if utxo.index == 0 {
                utxos.push(utxo);
            } else {
                change = Some(utxo);
            }
        }
        if let Some(change) = change {
            return Ok(vec![change]);
        }
        Ok(utxos)
    }

    /// Resolves a transaction by hash, checking the pool before the store.
    fn resolve_tx(&self, hash: &[u8]) -> Result<Transaction, Error> {
        if let Some(tx) = self.pool.get(hash) {
            return Ok(tx);
        }
        self.tx_store
            .get_by_hash(hash)?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", hex::encode(hash))))
    }
}

//! The consensus state machine: the only writer of blocks, transactions and
//! UTXOs.

use std::sync::Arc;

use slog::Logger;

use crate::consensus::StateMachine;
use crate::error::Error;
use crate::mempool::TxPool;
use crate::state::block::Block;
use crate::state::envelope::Envelope;
use crate::state::transaction::{Transaction, Utxo};
use crate::storage::codec;
use crate::storage::{
    BlockTransactionsStore, BlockchainStore, LedgerStore, TransactionStore, UtxoStore,
};

pub struct Fsm {
    store: Arc<LedgerStore>,
    pool: Arc<TxPool>,
    logger: Logger,
}

impl Fsm {
    pub fn new(store: Arc<LedgerStore>, pool: Arc<TxPool>, logger: Logger) -> Self {
        Self {
            store,
            pool,
            logger,
        }
    }

    fn apply_block(&self, block: Block, txs: Vec<Transaction>) -> Result<(), Error> {
        // Append-only: a timestamp collision surfaces as a hard error from
        // the store, not a retryable condition.
        self.store.blockchain().put(&block)?;

        let block_hash = block.compute_hash();
        let mut committed = Vec::with_capacity(txs.len());
        for mut tx in txs {
            tx.block_timestamp = block.timestamp;
            tx.block_hash = block_hash.clone();
            self.store.transactions().put(&tx)?;
            self.settle_utxos(&tx)?;
            committed.push(tx);
        }
        self.store
            .block_transactions()
            .put(block.timestamp, &committed)?;

        // Only after durable commit may the pending set go away.
        self.pool.purge();

        slog::info!(self.logger, "applied block";
            "timestamp" => block.timestamp,
            "transactions" => committed.len(),
        );
        Ok(())
    }

    /// Retires the inputs' owner set and records the new outputs.
    ///
    /// Transaction construction consumes every spendable output of the
    /// sender, so the sender's confirmed set collapses to the change output
    /// (or to nothing when the spend was exact). The receiver's output is
    /// appended to its set. Sender first: a self-payment must not lose its
    /// own index-0 output.
    fn settle_utxos(&self, tx: &Transaction) -> Result<(), Error> {
        let utxo_store = self.store.utxos();

        if let Some(input) = tx.inputs.first() {
            let change: Vec<Utxo> = tx
                .outputs
                .get(1)
                .map(|_| Utxo {
                    tx_hash: tx.hash.clone(),
                    index: 1,
                })
                .into_iter()
                .collect();
            utxo_store.put(&input.pub_key, &change)?;
        }

        if let Some(output) = tx.outputs.first() {
            let mut utxos = utxo_store.get(&output.pub_key)?;
            utxos.push(Utxo {
                tx_hash: tx.hash.clone(),
                index: 0,
            });
            utxo_store.put(&output.pub_key, &utxos)?;
        }
        Ok(())
    }
}

impl StateMachine for Fsm {
    fn apply(&self, entry: &[u8]) -> Result<(), Error> {
        match Envelope::from_bytes(entry)? {
            Envelope::Block(payload) => self.apply_block(payload.block, payload.txs),
            // Standalone transaction entries are reserved; durability is
            // reached through block envelopes only.
            Envelope::Transaction(_) => Ok(()),
        }
    }

    fn snapshot(&self) -> Result<Vec<u8>, Error> {
        let blocks = self.store.blockchain().get_all()?;
        Ok(codec::encode(&blocks)?.to_vec())
    }

    fn restore(&self, snapshot: &[u8]) -> Result<(), Error> {
        let blocks: Vec<Block> = codec::decode(snapshot)?;
        let chain = self.store.blockchain();
        chain.delete_all()?;
        for block in &blocks {
            chain.put(block)?;
        }
        slog::info!(self.logger, "restored blockchain from snapshot";
            "blocks" => blocks.len(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::crypto;
    use crate::merkle::MerkleTree;
    use crate::state::block::BlockTxs;
    use crate::state::transaction::{Amount, TxIn};

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn fixture() -> (tempfile::TempDir, Arc<LedgerStore>, Arc<TxPool>, Fsm) {
        let dir = tempdir().unwrap();
        let store = Arc::new(LedgerStore::open(dir.path().join("fsm.redb")).unwrap());
        let pool = Arc::new(TxPool::new());
        let fsm = Fsm::new(Arc::clone(&store), Arc::clone(&pool), test_logger());
        (dir, store, pool, fsm)
    }

    /// A spend of `total` paying `amount` to the receiver, change included
    /// when the amounts differ.
    fn spend(
        sender_sk: &secp256k1::SecretKey,
        receiver: &secp256k1::PublicKey,
        prev: Utxo,
        total: u64,
        amount: u64,
    ) -> Transaction {
        let sender_pk = crypto::public_key_of(sender_sk);
        let (r, s) = prev.sign(sender_sk);
        let mut tx = Transaction::new();
        tx.add_input(TxIn {
            prev,
            pub_key: crypto::public_key_bytes(&sender_pk),
            signature_r: r,
            signature_s: s,
            n_sequence: 0,
        });
        tx.add_output(Amount::new(amount), crypto::public_key_bytes(receiver));
        if total > amount {
            tx.add_output(
                Amount::new(total - amount),
                crypto::public_key_bytes(&sender_pk),
            );
        }
        tx.finalize_hash();
        tx
    }

    fn block_entry(txs: Vec<Transaction>) -> (Block, Vec<u8>) {
        let tree = MerkleTree::build(&txs).unwrap();
        let block = Block::new(vec![0u8; 64], tree.root().to_vec());
        let entry = Envelope::Block(BlockTxs {
            block: block.clone(),
            txs,
        })
        .to_bytes()
        .unwrap();
        (block, entry)
    }

    #[test]
    fn apply_persists_block_and_stamps_transactions() {
        let (_dir, store, pool, fsm) = fixture();
        let (sender_sk, sender_pk) = crypto::generate_keypair();
        let (_, receiver_pk) = crypto::generate_keypair();

        let prev = Utxo {
            tx_hash: vec![5u8; 64],
            index: 0,
        };
        let tx = spend(&sender_sk, &receiver_pk, prev, 100, 30);
        pool.add_tx(tx.clone());

        let (block, entry) = block_entry(vec![tx.clone()]);
        fsm.apply(&entry).unwrap();

        // Block persisted under its timestamp.
        let stored_block = store
            .blockchain()
            .get_by_timestamp(block.timestamp)
            .unwrap()
            .unwrap();
        assert_eq!(stored_block, block);

        // Transaction stamped and persisted.
        let stored_tx = store
            .transactions()
            .get_by_hash(&tx.hash)
            .unwrap()
            .unwrap();
        assert_eq!(stored_tx.block_timestamp, block.timestamp);
        assert_eq!(stored_tx.block_hash, block.compute_hash());

        // Block -> transactions index keeps proposal order.
        let block_txs = store
            .block_transactions()
            .get_by_block_timestamp(block.timestamp)
            .unwrap()
            .unwrap();
        assert_eq!(block_txs.len(), 1);
        assert_eq!(block_txs[0], tx);

        // Pool purged only after the apply.
        assert!(pool.is_empty());
        assert!(pool
            .get_utxos(&crypto::public_key_bytes(&sender_pk))
            .is_empty());
    }

    #[test]
    fn apply_updates_utxo_index() {
        let (_dir, store, _pool, fsm) = fixture();
        let (sender_sk, sender_pk) = crypto::generate_keypair();
        let (_, receiver_pk) = crypto::generate_keypair();
        let sender_key = crypto::public_key_bytes(&sender_pk);
        let receiver_key = crypto::public_key_bytes(&receiver_pk);

        // Sender starts with one confirmed output.
        let funding = Utxo {
            tx_hash: vec![5u8; 64],
            index: 0,
        };
        store.utxos().put(&sender_key, &[funding.clone()]).unwrap();

        let tx = spend(&sender_sk, &receiver_pk, funding, 100, 30);
        let (_, entry) = block_entry(vec![tx.clone()]);
        fsm.apply(&entry).unwrap();

        // Receiver gained the payment output.
        let receiver_utxos = store.utxos().get(&receiver_key).unwrap();
        assert_eq!(
            receiver_utxos,
            vec![Utxo {
                tx_hash: tx.hash.clone(),
                index: 0
            }]
        );

        // Sender's set collapsed to the change output; the consumed
        // funding UTXO is gone.
        let sender_utxos = store.utxos().get(&sender_key).unwrap();
        assert_eq!(
            sender_utxos,
            vec![Utxo {
                tx_hash: tx.hash.clone(),
                index: 1
            }]
        );
    }

    #[test]
    fn exact_spend_clears_sender_utxos() {
        let (_dir, store, _pool, fsm) = fixture();
        let (sender_sk, sender_pk) = crypto::generate_keypair();
        let (_, receiver_pk) = crypto::generate_keypair();
        let sender_key = crypto::public_key_bytes(&sender_pk);

        let funding = Utxo {
            tx_hash: vec![6u8; 64],
            index: 0,
        };
        store.utxos().put(&sender_key, &[funding.clone()]).unwrap();

        let tx = spend(&sender_sk, &receiver_pk, funding, 100, 100);
        let (_, entry) = block_entry(vec![tx]);
        fsm.apply(&entry).unwrap();

        assert!(store.utxos().get(&sender_key).unwrap().is_empty());
    }

    #[test]
    fn duplicate_block_timestamp_fails_hard() {
        let (_dir, _store, _pool, fsm) = fixture();
        let (sender_sk, _) = crypto::generate_keypair();
        let (_, receiver_pk) = crypto::generate_keypair();
        let prev = Utxo {
            tx_hash: vec![7u8; 64],
            index: 0,
        };
        let tx = spend(&sender_sk, &receiver_pk, prev, 10, 10);
        let (_, entry) = block_entry(vec![tx]);

        fsm.apply(&entry).unwrap();
        assert!(fsm.apply(&entry).is_err());
    }

    #[test]
    fn transaction_envelope_is_a_noop() {
        let (_dir, store, _pool, fsm) = fixture();
        let mut tx = Transaction::new();
        tx.add_output(Amount::new(1), vec![1u8; 33]);
        tx.finalize_hash();

        let entry = Envelope::Transaction(tx.clone()).to_bytes().unwrap();
        fsm.apply(&entry).unwrap();
        assert_eq!(store.transactions().get_by_hash(&tx.hash).unwrap(), None);
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let (_dir, store, _pool, fsm) = fixture();
        let genesis = Block::genesis();
        store.blockchain().put(&genesis).unwrap();
        let mut next = Block::new(genesis.compute_hash(), vec![1u8; 64]);
        next.timestamp = 50;
        store.blockchain().put(&next).unwrap();

        let snapshot = fsm.snapshot().unwrap();

        // Diverge local state, then restore.
        store.blockchain().delete_all().unwrap();
        let mut stray = Block::new(vec![], vec![2u8; 64]);
        stray.timestamp = 999;
        store.blockchain().put(&stray).unwrap();

        fsm.restore(&snapshot).unwrap();
        assert_eq!(store.blockchain().keys().unwrap(), vec![0, 50]);
        assert_eq!(store.blockchain().latest().unwrap(), Some(next));
    }
}

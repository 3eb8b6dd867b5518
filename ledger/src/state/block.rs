use rkyv::{Archive, Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::state::now_nanos;
use crate::state::transaction::Transaction;

/// One link of the chain. Blocks reference their predecessor by hash and
/// are keyed by their (monotonically increasing) timestamp.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Creation time (ns); doubles as the storage key.
    pub timestamp: u64,
    /// Hash of the previous block; empty only for genesis.
    pub prev_hash: Vec<u8>,
    /// Merkle root over the block's transactions.
    pub merkle_root: Vec<u8>,
    pub hash: Vec<u8>,
}

impl Block {
    pub fn new(prev_hash: Vec<u8>, merkle_root: Vec<u8>) -> Self {
        let mut block = Self {
            timestamp: now_nanos(),
            prev_hash,
            merkle_root,
            hash: Vec::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Genesis marker block written once at bootstrap.
    pub fn genesis() -> Self {
        Self {
            timestamp: 0,
            prev_hash: Vec::new(),
            merkle_root: Vec::new(),
            hash: b"genesis".to_vec(),
        }
    }

    /// SHA-512 over the decimal timestamp, previous hash and Merkle root.
    pub fn compute_hash(&self) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(self.timestamp.to_string().as_bytes());
        hasher.update(&self.prev_hash);
        hasher.update(&self.merkle_root);
        hasher.finalize().to_vec()
    }
}

/// Consensus log payload: a block together with the transactions it commits,
/// in the exact order the proposer built the Merkle tree over.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BlockTxs {
    pub block: Block,
    pub txs: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_depends_on_all_fields() {
        let base = Block::new(vec![1, 2, 3], vec![4, 5, 6]);
        let mut other = base.clone();
        other.prev_hash = vec![9, 9, 9];
        assert_ne!(base.compute_hash(), other.compute_hash());

        let mut other = base.clone();
        other.merkle_root = vec![9];
        assert_ne!(base.compute_hash(), other.compute_hash());

        let mut other = base.clone();
        other.timestamp += 1;
        assert_ne!(base.compute_hash(), other.compute_hash());
    }

    #[test]
    fn new_pins_hash() {
        let block = Block::new(Vec::new(), vec![7u8; 64]);
        assert_eq!(block.hash, block.compute_hash());
        assert_eq!(block.hash.len(), 64);
    }
}

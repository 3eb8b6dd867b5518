//! Merkle commitments over ordered transaction batches.
//!
//! The tree is built level by level from the transaction hashes. Paired
//! nodes hash as `H(left ‖ right)`; an unpaired trailing node is *promoted* —
//! its parent takes the child's hash unchanged, and that level contributes no
//! sibling to an inclusion proof. This asymmetry (promotion, not
//! duplicate-node hashing) is part of the commitment format and proof
//! verification depends on it.

use sha2::{Digest, Sha512};

use crate::error::Error;
use crate::state::transaction::Transaction;

/// A Merkle tree over an ordered, non-empty transaction batch.
///
/// Kept as a level array rather than linked nodes: `levels[0]` holds the
/// leaf hashes in batch order, the last level holds the single root.
pub struct MerkleTree {
    levels: Vec<Vec<Vec<u8>>>,
    leaf_ids: Vec<[u8; 16]>,
}

/// One step of an inclusion proof: the sibling hash and which side of the
/// concatenation it lands on.
struct ProofStep {
    hash: Vec<u8>,
    sibling_is_left: bool,
}

impl MerkleTree {
    /// Builds the tree. Fails on an empty batch.
    pub fn build(txs: &[Transaction]) -> Result<Self, Error> {
        if txs.is_empty() {
            return Err(Error::EmptyInput);
        }

        let leaves: Vec<Vec<u8>> = txs.iter().map(|tx| tx.hash.clone()).collect();
        let leaf_ids: Vec<[u8; 16]> = txs.iter().map(|tx| tx.id).collect();

        let mut levels = vec![leaves];
        while levels[levels.len() - 1].len() > 1 {
            let next = {
                let prev = &levels[levels.len() - 1];
                let mut next = Vec::with_capacity(prev.len().div_ceil(2));
                for pair in prev.chunks(2) {
                    if pair.len() == 2 {
                        next.push(hash_pair(&pair[0], &pair[1]));
                    } else {
                        // Unpaired trailing node: promote the hash unchanged.
                        next.push(pair[0].clone());
                    }
                }
                next
            };
            levels.push(next);
        }

        Ok(Self { levels, leaf_ids })
    }

    /// The root hash committing to the whole batch.
    pub fn root(&self) -> &[u8] {
        &self.levels[self.levels.len() - 1][0]
    }

    /// Checks that `tx` is committed to by this tree.
    ///
    /// Locates the leaf by transaction id, collects the sibling path, and
    /// recomputes the root from the transaction's own hash. Fails with
    /// [`Error::TransactionNotInTree`] when no leaf carries the id.
    pub fn verify_inclusion(&self, tx: &Transaction) -> Result<bool, Error> {
        let index = self
            .leaf_ids
            .iter()
            .position(|id| *id == tx.id)
            .ok_or(Error::TransactionNotInTree)?;

        let mut current = tx.hash.clone();
        for step in self.proof_path(index) {
            current = if step.sibling_is_left {
                hash_pair(&step.hash, &current)
            } else {
                hash_pair(&current, &step.hash)
            };
        }
        Ok(current.as_slice() == self.root())
    }

    /// Sibling hashes from leaf `index` up to the root. Promoted levels
    /// contribute nothing.
    fn proof_path(&self, mut index: usize) -> Vec<ProofStep> {
        let mut path = Vec::new();
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if sibling < level.len() {
                path.push(ProofStep {
                    hash: level[sibling].clone(),
                    sibling_is_left: sibling < index,
                });
            }
            index /= 2;
        }
        path
    }
}

fn hash_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().to_vec()
}

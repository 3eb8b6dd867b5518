use rkyv::{Archive, Deserialize, Serialize};
use secp256k1::{PublicKey, SecretKey};
use sha2::{Digest, Sha512};
use uuid::Uuid;

use crate::crypto;
use crate::state::now_nanos;

/// Default display denominator: 1 coin = 10^8 base units.
pub const CURRENCY_UNIT: u32 = 100_000_000;

/// Fixed-point currency value. `unit` is a denominator for display and is
/// never used in arithmetic.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    pub value: u64,
    pub unit: u32,
}

impl Amount {
    pub fn new(value: u64) -> Self {
        Self {
            value,
            unit: CURRENCY_UNIT,
        }
    }

    pub fn zero() -> Self {
        Self { value: 0, unit: 0 }
    }

    /// Byte layout fed into transaction hashes: le64(value) ‖ le32(unit).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12);
        out.extend_from_slice(&self.value.to_le_bytes());
        out.extend_from_slice(&self.unit.to_le_bytes());
        out
    }
}

/// A reference to one spendable transaction output.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// Hash of the transaction that produced the output.
    pub tx_hash: Vec<u8>,
    /// Index of the output within that transaction. Index 0 pays the
    /// receiver; a non-zero index is the sender's change.
    pub index: u32,
}

impl Utxo {
    /// Proves ownership: signs the referenced transaction's hash.
    pub fn sign(&self, key: &SecretKey) -> ([u8; 32], [u8; 32]) {
        crypto::sign_tx_hash(key, &self.tx_hash)
    }

    pub fn verify(&self, public: &PublicKey, r: &[u8; 32], s: &[u8; 32]) -> bool {
        crypto::verify_tx_hash(public, &self.tx_hash, r, s)
    }
}

/// Authorizes consumption of one referenced UTXO.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub prev: Utxo,
    /// Compressed SEC1 key of the signer.
    pub pub_key: Vec<u8>,
    pub signature_r: [u8; 32],
    pub signature_s: [u8; 32],
    pub n_sequence: u32,
}

/// One transaction output. Immutable once created.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// ID of the transaction this output belongs to.
    pub tx_id: [u8; 16],
    pub amount: Amount,
    /// Compressed SEC1 key of the recipient.
    pub pub_key: Vec<u8>,
}

/// A transfer of value between keys.
///
/// The hash is a SHA-512 digest over the id, creation timestamp, lock-time
/// counter and all outputs — inputs are deliberately excluded. It is the
/// pool key, the Merkle leaf and the primary storage key, and must never
/// change once computed.
#[derive(Archive, Deserialize, Serialize, Debug, Clone)]
pub struct Transaction {
    /// UUIDv4, also the public lookup handle.
    pub id: [u8; 16],
    /// Creation time (ns).
    pub timestamp: u64,
    /// Reserved sequence counter, always 0 for now. Hashed.
    pub n_lock_time: u32,
    /// Timestamp of the containing block; 0 until confirmed.
    pub block_timestamp: u64,
    /// Hash of the containing block; empty until confirmed.
    pub block_hash: Vec<u8>,
    pub salt: [u8; 16],
    pub hash: Vec<u8>,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().into_bytes(),
            timestamp: now_nanos(),
            n_lock_time: 0,
            block_timestamp: 0,
            block_hash: Vec::new(),
            salt: Uuid::new_v4().into_bytes(),
            hash: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn id_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.id)
    }

    pub fn add_input(&mut self, input: TxIn) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, amount: Amount, pub_key: Vec<u8>) {
        self.outputs.push(TxOut {
            tx_id: self.id,
            amount,
            pub_key,
        });
    }

    /// Deterministic digest over id, timestamp, lock time and outputs.
    pub fn compute_hash(&self) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(self.id);
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(u64::from(self.n_lock_time).to_le_bytes());
        for out in &self.outputs {
            hasher.update(out.tx_id);
            hasher.update(&out.pub_key);
            hasher.update(out.amount.to_bytes());
        }
        hasher.finalize().to_vec()
    }

    /// Computes and pins the hash. Must be called exactly once, after the
    /// last output is appended.
    pub fn finalize_hash(&mut self) {
        self.hash = self.compute_hash();
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Transaction {}

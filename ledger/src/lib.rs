//! Core library for the tally ledger node.
//!
//! This crate contains everything that runs identically on every replica:
//! - Value types for the UTXO data model ([`state`])
//! - Key handling and ownership signatures ([`crypto`])
//! - Merkle commitments over transaction batches ([`merkle`])
//! - The in-memory transaction pool ([`mempool`])
//! - Transaction construction, balances and inclusion verification
//!   ([`transactor`])
//! - The replicated ledger: block proposal, the consensus state machine and
//!   the block scheduler ([`chain`], [`consensus`])
//! - redb-backed persistence ([`storage`])
//!
//! The consensus library itself is an external collaborator reached through
//! the [`consensus::RaftApi`] trait; this crate only submits envelopes to the
//! log and applies them back in committed order.

pub mod chain;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod mempool;
pub mod merkle;
pub mod state;
pub mod storage;
pub mod transactor;

pub use chain::Chain;
pub use error::Error;
pub use mempool::TxPool;
pub use merkle::MerkleTree;
pub use transactor::Transactor;

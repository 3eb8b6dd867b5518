//! Error taxonomy for the ledger core.

use thiserror::Error;

/// Errors surfaced by the ledger core.
///
/// Construction failures (`NotOwner`, `Signature`, `InsufficientBalance`)
/// abort the operation with no partial state; `Consensus` covers log
/// submission timeouts and not-leader conditions. Nothing in this crate
/// retries a consensus submission — retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A Merkle tree was requested over an empty transaction batch.
    #[error("no transactions provided")]
    EmptyInput,

    /// Malformed key material or missing request fields.
    #[error("validation: {0}")]
    Validation(String),

    /// The referenced output is not owned by the signing key.
    #[error("sender does not own output of transaction {tx_hash}")]
    NotOwner { tx_hash: String },

    /// The ownership signature failed its self-check.
    #[error("cannot verify signature over transaction {tx_hash}")]
    Signature { tx_hash: String },

    /// The sender's spendable outputs do not cover the requested amount.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    /// A referenced entity (user, transaction, block, output index) is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The transaction is not part of the committed block it claims.
    #[error("transaction not found in tree")]
    TransactionNotInTree,

    /// Log submission failed, timed out, or required leadership we lack.
    #[error("consensus: {0}")]
    Consensus(String),

    /// Persistence-layer failure.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

//! Error types for the gRPC API.

use thiserror::Error;
use tonic::Status;

/// RPC-specific errors that can occur during request processing.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Malformed key material or missing request fields
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested resource was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Sender's spendable outputs do not cover the requested amount
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u64, need: u64 },

    /// Sender does not own a referenced output
    #[error("Not owner of transaction output: {0}")]
    NotOwner(String),

    /// Ownership signature failed verification
    #[error("Invalid signature over transaction: {0}")]
    InvalidSignature(String),

    /// Transaction is not part of any committed block
    #[error("Transaction not found in tree")]
    NotCommitted,

    /// Consensus rejected or timed out on the operation
    #[error("Consensus error: {0}")]
    Consensus(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ledger::Error> for RpcError {
    fn from(err: ledger::Error) -> Self {
        match err {
            ledger::Error::Validation(msg) => RpcError::InvalidArgument(msg),
            ledger::Error::NotFound(what) => RpcError::NotFound(what),
            ledger::Error::InsufficientBalance { have, need } => {
                RpcError::InsufficientBalance { have, need }
            }
            ledger::Error::NotOwner { tx_hash } => RpcError::NotOwner(tx_hash),
            ledger::Error::Signature { tx_hash } => RpcError::InvalidSignature(tx_hash),
            ledger::Error::TransactionNotInTree => RpcError::NotCommitted,
            ledger::Error::Consensus(msg) => RpcError::Consensus(msg),
            ledger::Error::EmptyInput => RpcError::Internal("empty transaction batch".into()),
            ledger::Error::Storage(err) => RpcError::Internal(format!("storage: {err}")),
        }
    }
}

impl From<RpcError> for Status {
    fn from(err: RpcError) -> Self {
        match &err {
            RpcError::InvalidArgument(_) => Status::invalid_argument(err.to_string()),
            RpcError::NotFound(_) => Status::not_found(err.to_string()),
            RpcError::InsufficientBalance { .. } => Status::failed_precondition(err.to_string()),
            RpcError::NotOwner(_) => Status::failed_precondition(err.to_string()),
            RpcError::InvalidSignature(_) => Status::failed_precondition(err.to_string()),
            RpcError::NotCommitted => Status::failed_precondition(err.to_string()),
            RpcError::Consensus(_) => Status::unavailable(err.to_string()),
            RpcError::Internal(_) => Status::internal(err.to_string()),
        }
    }
}

/// Shortcut for handlers mapping core errors straight to a `Status`.
pub fn to_status(err: ledger::Error) -> Status {
    Status::from(RpcError::from(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_is_failed_precondition() {
        let status = Status::from(RpcError::from(ledger::Error::InsufficientBalance {
            have: 40,
            need: 100,
        }));
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
        assert!(status.message().contains("40"));
    }

    #[test]
    fn validation_is_invalid_argument() {
        let status = to_status(ledger::Error::Validation("bad key".into()));
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn not_found_maps_through() {
        let status = to_status(ledger::Error::NotFound("user bob".into()));
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("bob"));
    }

    #[test]
    fn consensus_is_unavailable() {
        let status = to_status(ledger::Error::Consensus("apply timed out".into()));
        assert_eq!(status.code(), tonic::Code::Unavailable);
    }
}

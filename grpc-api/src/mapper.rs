//! Conversions between domain types and wire messages.

use ledger::state::block::Block;
use ledger::state::transaction::{Amount, Transaction};
use ledger::state::user::User;
use uuid::Uuid;

use crate::error::RpcError;
use crate::proto;

pub fn amount_to_proto(amount: &Amount) -> proto::Amount {
    proto::Amount {
        value: amount.value,
        unit: amount.unit,
    }
}

/// Extracts a required amount field.
pub fn amount_from_proto(amount: Option<proto::Amount>) -> Result<Amount, RpcError> {
    let amount = amount.ok_or_else(|| RpcError::InvalidArgument("amount is required".into()))?;
    Ok(Amount {
        value: amount.value,
        unit: amount.unit,
    })
}

pub fn tx_to_proto(tx: &Transaction) -> proto::Transaction {
    proto::Transaction {
        id: tx.id_uuid().to_string(),
        timestamp: tx.timestamp,
        hash: tx.hash.clone(),
        block_timestamp: tx.block_timestamp,
        block_hash: tx.block_hash.clone(),
        inputs: tx
            .inputs
            .iter()
            .map(|input| proto::TxIn {
                prev: Some(proto::Utxo {
                    tx_hash: input.prev.tx_hash.clone(),
                    index: input.prev.index,
                }),
                pub_key: input.pub_key.clone(),
                signature_r: input.signature_r.to_vec(),
                signature_s: input.signature_s.to_vec(),
                n_sequence: input.n_sequence,
            })
            .collect(),
        outputs: tx
            .outputs
            .iter()
            .map(|output| proto::TxOut {
                tx_id: Uuid::from_bytes(output.tx_id).to_string(),
                amount: Some(amount_to_proto(&output.amount)),
                pub_key: output.pub_key.clone(),
            })
            .collect(),
    }
}

pub fn block_to_proto(block: &Block) -> proto::Block {
    proto::Block {
        timestamp: block.timestamp,
        prev_hash: block.prev_hash.clone(),
        merkle_root: block.merkle_root.clone(),
        hash: block.hash.clone(),
    }
}

pub fn user_to_proto(user: &User) -> proto::User {
    proto::User {
        username: user.username.clone(),
        public_key: hex::encode(&user.public_key),
        private_key: hex::encode(&user.private_key),
    }
}

pub fn user_from_proto(user: proto::User) -> Result<User, RpcError> {
    if user.username.is_empty() {
        return Err(RpcError::InvalidArgument("username is required".into()));
    }
    let public_key = hex::decode(user.public_key.trim())
        .map_err(|e| RpcError::InvalidArgument(format!("invalid public key hex: {e}")))?;
    let private_key = hex::decode(user.private_key.trim())
        .map_err(|e| RpcError::InvalidArgument(format!("invalid private key hex: {e}")))?;
    Ok(User {
        username: user.username,
        public_key,
        private_key,
    })
}

/// Parses a transaction id from its wire form.
pub fn tx_id_from_proto(id: &str) -> Result<Uuid, RpcError> {
    Uuid::parse_str(id.trim())
        .map_err(|e| RpcError::InvalidArgument(format!("invalid transaction id: {e}")))
}

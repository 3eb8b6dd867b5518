use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;
use crate::state::block::BlockTxs;
use crate::state::transaction::Transaction;
use crate::storage::codec;

/// The unit appended to the consensus log. The state machine matches on the
/// variant exhaustively; `Transaction` entries are reserved for standalone
/// transaction replication and are currently ignored on apply.
#[derive(Archive, Deserialize, Serialize, Debug, Clone)]
pub enum Envelope {
    Block(BlockTxs),
    Transaction(Transaction),
}

impl Envelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(codec::encode(self)?.to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Ok(codec::decode(bytes)?)
    }
}

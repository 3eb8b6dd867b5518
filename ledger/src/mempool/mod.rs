//! In-memory staging for unconfirmed transactions.

mod pool;

pub use pool::TxPool;

//! gRPC service implementations.

mod ledger;

pub use self::ledger::LedgerServiceImpl;

//! Seams to the consensus library, plus the pieces of this node that hang
//! off it: the state machine ([`fsm`]), the block scheduler ([`scheduler`])
//! and a single-voter in-process engine ([`local`]).
//!
//! Leader election, log replication and commit are owned entirely by the
//! consensus implementation behind [`RaftApi`]. This crate's contract with
//! it is narrow: submit an entry to the log (blocking, bounded by a
//! timeout), and have [`StateMachine::apply`] invoked with committed entries
//! strictly in commit order, at most once concurrently per node.

pub mod fsm;
pub mod local;
pub mod scheduler;

use std::time::Duration;

use crate::error::Error;

/// Identity of a consensus member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerId(pub String);

/// Consensus transport address of a member (host:port).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress(pub String);

impl std::fmt::Display for ServerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The surface of the consensus library this node depends on.
pub trait RaftApi: Send + Sync {
    /// Appends an entry to the replicated log and blocks until it commits
    /// or the timeout elapses. On timeout nothing partial is applied — log
    /// application is all-or-nothing.
    fn apply(&self, entry: Vec<u8>, timeout: Duration) -> Result<(), Error>;

    /// The current leader's transport address and id.
    fn leader_with_id(&self) -> (ServerAddress, ServerId);

    fn add_voter(&self, id: ServerId, address: ServerAddress) -> Result<(), Error>;

    fn add_nonvoter(&self, id: ServerId, address: ServerAddress) -> Result<(), Error>;

    fn remove_server(&self, id: ServerId) -> Result<(), Error>;
}

/// Deterministic state transition run by every replica.
pub trait StateMachine: Send + Sync {
    /// Applies one committed log entry. Invoked in commit order; the
    /// consensus library guarantees at most one concurrent invocation.
    fn apply(&self, entry: &[u8]) -> Result<(), Error>;

    /// Serializes the full state for log compaction.
    fn snapshot(&self) -> Result<Vec<u8>, Error>;

    /// Replaces the state wholesale before log replay resumes.
    fn restore(&self, snapshot: &[u8]) -> Result<(), Error>;
}

//! gRPC API for the tally ledger node.
//!
//! This crate provides the node's full RPC surface:
//! - Transaction submission, balances and inclusion verification
//! - User registry access
//! - Consensus membership changes
//! - Block queries
//!
//! Every call executes on the consensus leader; handlers on a non-leader
//! replica forward the identical typed call through [`router::LeaderRouter`]
//! and relay the leader's response unmodified.

pub mod config;
pub mod error;
pub mod mapper;
pub mod router;
pub mod server;
pub mod services;

/// Generated protobuf code from tonic-build.
/// This module is populated by the build.rs script.
#[allow(clippy::all)]
#[allow(clippy::pedantic)]
pub mod proto {
    tonic::include_proto!("tally.v1");
}

// Re-export key types for convenience
pub use config::RpcConfig;
pub use error::RpcError;
pub use router::LeaderRouter;
pub use server::{RpcContext, RpcServer};

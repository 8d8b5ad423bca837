//! # Murmur
//!
//! Decentralized, eventually-consistent key/value dissemination. Each node
//! publishes local facts and learns everyone else's by periodically
//! pulling from randomly chosen peers.
//!
//! ## Overview
//!
//! - **Publish**: Local facts are versioned by a per-node counter
//! - **Gossip**: Every tick, a node sends a compact version summary to a
//!   few random peers and merges the diff they answer with
//! - **Converge**: With no central sequencer, every reachable node
//!   eventually holds the newest version of every fact
//!
//! ## Key Concepts
//!
//! - **Version**: Assigned by the owning node. Never reused, never lowered.
//! - **Summary**: Highest version known per node; what a requester sends.
//! - **Diff**: Only the entries the requester lacks; what a responder sends.
//! - **Fan-out**: Number of rounds a node starts per tick.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use murmur::{Node, NodeConfig};
//!
//! async fn example() -> murmur::Result<()> {
//!     let seeds = vec!["127.0.0.1:20000".to_string()];
//!     let node = Node::tcp("127.0.0.1:20001", &seeds, NodeConfig::default());
//!
//!     node.start().await?;
//!     node.publish("role", "cache");
//!
//!     // Later: read what the cluster has told us.
//!     let view = node.snapshot();
//!     println!("{} nodes known", view.len());
//!
//!     node.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `murmur::core` - Data model and reconciliation
//! - `murmur::store` - The lock-guarded state model
//! - `murmur::sync` - Exchange protocol, transports, scheduler

pub mod error;
pub mod node;

// Re-export component crates
pub use murmur_core as core;
pub use murmur_store as store;
pub use murmur_sync as sync;

// Re-export main types for convenience
pub use error::{NodeError, Result};
pub use node::{Node, NodeConfig};

// Re-export commonly used types
pub use murmur_core::{Info, NodeAddress, Snapshot, VersionSummary, VersionedValue};
pub use murmur_sync::{
    CodecKind, MemoryNetwork, RoundReport, SyncConfig, TcpTransport, Transport,
};

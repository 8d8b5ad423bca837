//! # Murmur Store
//!
//! The state model for Murmur: the local node's versioned view of every
//! node it has heard about, plus the counter that versions its own writes.
//!
//! ## Overview
//!
//! [`StateStore`] wraps the pure reconciliation functions of
//! `murmur_core::reconcile` behind one reader-writer lock. Reads return
//! deep copies; merges and diffs each run as one critical section.
//!
//! ## Usage
//!
//! ```rust
//! use murmur_core::NodeAddress;
//! use murmur_store::StateStore;
//!
//! let store = StateStore::new(NodeAddress::new("tcp", "127.0.0.1:7000"));
//! assert_eq!(store.publish("x", "1"), 1);
//! assert_eq!(store.publish("x", "2"), 2);
//!
//! let summary = store.summarize_max_versions();
//! assert_eq!(summary[store.local_address()], 2);
//! ```
//!
//! ## Design Notes
//!
//! - **Monotonic versions**: merges only raise a stored version
//! - **No persistence**: state lives for the life of the process
//! - **Coarse lock**: one lock covers the whole snapshot

pub mod state;

pub use state::StateStore;

//! # Murmur Core
//!
//! Pure primitives for Murmur: the versioned key/value data model and the
//! anti-entropy reconciliation algorithm.
//!
//! This crate contains no I/O, no locking, no networking. It is pure
//! computation over snapshots of cluster state.
//!
//! ## Key Types
//!
//! - [`NodeAddress`] - Identity of a node (network kind + endpoint)
//! - [`VersionedValue`] - A value tagged with its owner's version counter
//! - [`Info`] - Everything one node has published
//! - [`Snapshot`] - The local belief about every known node
//! - [`VersionSummary`] - Highest known version per node
//!
//! ## Reconciliation
//!
//! Deltas and merges are computed by the functions in [`reconcile`]:
//!
//! ```rust
//! use murmur_core::{reconcile, NodeAddress, Snapshot, VersionSummary, VersionedValue};
//!
//! let a = NodeAddress::new("tcp", "10.0.0.1:7000");
//!
//! let mut theirs = Snapshot::new();
//! theirs.entry(a.clone()).or_default().insert("x".into(), VersionedValue::new(1, "1"));
//!
//! // We know nothing, so the peer offers everything it has.
//! let diff = reconcile::diff_missing_or_newer(&theirs, &VersionSummary::new());
//!
//! let mut ours = Snapshot::new();
//! let outcome = reconcile::merge_into(&mut ours, diff);
//! assert_eq!(outcome.adopted, 1);
//! assert_eq!(ours[&a]["x"].value, "1");
//! ```

pub mod error;
pub mod reconcile;
pub mod types;

pub use error::{CoreError, Result};
pub use reconcile::{
    diff_missing_or_newer, exclude_address, max_version, merge_into, summarize, MergeOutcome,
};
pub use types::{Info, NodeAddress, Snapshot, VersionSummary, VersionedValue};

//! # Murmur Testkit
//!
//! Testing utilities for Murmur.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for snapshots and summaries
//! - **Fixtures**: In-memory clusters of running nodes
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use murmur_testkit::generators::snapshot;
//!
//! proptest! {
//!     #[test]
//!     fn merge_is_idempotent(remote in snapshot()) {
//!         let mut once = Default::default();
//!         murmur_core::merge_into(&mut once, remote.clone());
//!         let mut twice = once.clone();
//!         murmur_core::merge_into(&mut twice, remote);
//!         prop_assert_eq!(once, twice);
//!     }
//! }
//! ```
//!
//! ## Clusters
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use murmur_testkit::fixtures::Cluster;
//!
//! async fn example() {
//!     let cluster = Cluster::start(5, Cluster::fast_config()).await;
//!     cluster.node(4).publish("k", "v");
//!     assert!(cluster.wait_for_convergence(Duration::from_secs(5)).await);
//!     cluster.shutdown().await;
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{init_tracing, Cluster};
pub use generators::{info, node_address, snapshot, version_summary};

//! Proptest generators for property-based testing.

use proptest::prelude::*;

use murmur_core::{Info, NodeAddress, Snapshot, VersionSummary, VersionedValue};

/// Generate an address drawn from a small pool so snapshots overlap.
pub fn node_address() -> impl Strategy<Value = NodeAddress> {
    (0u8..8).prop_map(|i| NodeAddress::new("memory", format!("n{i}")))
}

/// Generate a key drawn from a small pool so infos overlap.
pub fn key() -> impl Strategy<Value = String> {
    "[a-e]".prop_map(String::from)
}

/// Generate a version-stamped value.
pub fn versioned_value() -> impl Strategy<Value = VersionedValue> {
    (1u64..=20, "[a-z0-9]{0,6}").prop_map(|(version, value)| VersionedValue::new(version, value))
}

/// Generate the facts of one node. May be empty.
pub fn info() -> impl Strategy<Value = Info> {
    prop::collection::hash_map(key(), versioned_value(), 0..5)
}

/// Generate a snapshot. Addresses may carry empty infos.
pub fn snapshot() -> impl Strategy<Value = Snapshot> {
    prop::collection::hash_map(node_address(), info(), 0..6)
}

/// Generate an arbitrary summary, not necessarily derived from a snapshot.
pub fn version_summary() -> impl Strategy<Value = VersionSummary> {
    prop::collection::hash_map(node_address(), 0u64..=20, 0..6)
}

//! Strong type definitions for Murmur.
//!
//! Addresses are newtypes so they cannot be confused with bare endpoint
//! strings; the state containers are plain maps so callers can use the full
//! `HashMap` API on a snapshot they own.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Identity of a node: the transport kind plus an endpoint on that transport.
///
/// Serialized as its textual form `network://endpoint` so it can be used as a
/// map key by every wire codec.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress {
    /// Transport kind, e.g. `tcp` or `memory`.
    pub network: String,
    /// Endpoint on that transport, e.g. `127.0.0.1:7000`.
    pub endpoint: String,
}

impl NodeAddress {
    /// Create a new address.
    pub fn new(network: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({self})")
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.network, self.endpoint)
    }
}

impl FromStr for NodeAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("://") {
            Some((network, endpoint)) if !network.is_empty() && !endpoint.is_empty() => {
                Ok(Self::new(network, endpoint))
            }
            _ => Err(CoreError::InvalidAddress(s.to_string())),
        }
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A value published by a node, tagged with the owner's version counter at
/// write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    /// Owner-assigned version. Never reused or decreased by the owner.
    pub version: u64,
    /// The published value.
    pub value: String,
}

impl VersionedValue {
    /// Create a new versioned value.
    pub fn new(version: u64, value: impl Into<String>) -> Self {
        Self {
            version,
            value: value.into(),
        }
    }
}

/// Everything one node has published, keyed by fact name.
pub type Info = HashMap<String, VersionedValue>;

/// The local belief about cluster state: one [`Info`] per known node,
/// including the local node's own entry.
pub type Snapshot = HashMap<NodeAddress, Info>;

/// Highest version known per node. This is what a node transmits instead of
/// its full state.
pub type VersionSummary = HashMap<NodeAddress, u64>;

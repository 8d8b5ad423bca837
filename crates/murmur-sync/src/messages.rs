//! Gossip protocol message types.
//!
//! Exactly two messages exist: the requester's version summary and the
//! responder's diff.

use serde::{Deserialize, Serialize};

use murmur_core::{Snapshot, VersionSummary};

/// Message size limits.
pub mod limits {
    /// Default maximum encoded size of one frame.
    pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;
    /// Size of the big-endian length prefix in front of every frame.
    pub const FRAME_HEADER_BYTES: usize = 4;
}

/// Gossip protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GossipMessage {
    /// Active side: the highest version known for every address.
    Summary {
        /// Highest known version per address.
        versions: VersionSummary,
    },

    /// Passive side: entries the requester is missing or stale on.
    Diff {
        /// Entries strictly newer than the requester's claim.
        entries: Snapshot,
    },
}

impl GossipMessage {
    /// Short name for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            GossipMessage::Summary { .. } => "Summary",
            GossipMessage::Diff { .. } => "Diff",
        }
    }

    /// Number of addresses carried.
    pub fn address_count(&self) -> usize {
        match self {
            GossipMessage::Summary { versions } => versions.len(),
            GossipMessage::Diff { entries } => entries.len(),
        }
    }
}

//! Error types for the Node.

use murmur_core::CoreError;
use murmur_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during Node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The listening endpoint could not be bound. The node cannot run.
    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: SyncError,
    },

    /// The endpoint asks the OS for a port. The node gossips its configured
    /// endpoint, so peers could never dial it back.
    #[error("endpoint {0} uses port 0; nodes must listen on the address they advertise")]
    EphemeralEndpoint(String),

    /// `start` was called on a node that is already running.
    #[error("node already started")]
    AlreadyStarted,

    /// The operation needs a running node.
    #[error("node is not running")]
    NotRunning,

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for Node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

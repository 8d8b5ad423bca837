//! Error types for the sync module.

use thiserror::Error;

/// Errors that can occur while exchanging state with a peer.
///
/// Every variant is scoped to a single connection or round; none of them is
/// fatal to the node except a failed bind at startup.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Underlying stream read/write failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not establish a connection to the peer.
    #[error("dial {endpoint} failed: {reason}")]
    Dial { endpoint: String, reason: String },

    /// Endpoint is already bound on this network.
    #[error("address in use: {0}")]
    AddressInUse(String),

    /// Message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Incoming or outgoing frame exceeds the configured limit.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Peer did not answer in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Peer sent a message that is not valid at this point of the exchange.
    #[error("unexpected message: {0}")]
    UnexpectedMessage(String),

    /// The connection's receive task has ended.
    #[error("connection closed")]
    ConnectionClosed,

    /// Shutdown was requested.
    #[error("cancelled")]
    Cancelled,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

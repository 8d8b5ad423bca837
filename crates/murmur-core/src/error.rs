//! Error types for Murmur Core.

use thiserror::Error;

/// Core errors that can occur while handling the data model.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Textual address is not of the form `network://endpoint`.
    #[error("invalid node address: {0}")]
    InvalidAddress(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

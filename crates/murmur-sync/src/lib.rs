//! # Murmur Sync
//!
//! Pull-based gossip for converging state between nodes.
//!
//! ## Overview
//!
//! The sync module implements the anti-entropy exchange that lets every
//! node eventually learn every other node's published facts, with no
//! central coordinator. A scheduler periodically picks random peers; for
//! each one, a single summary/diff round trip brings the local view up to
//! date with what that peer knows.
//!
//! ## Key Properties
//!
//! - **Idempotent**: Merging the same diff twice changes nothing
//! - **Monotonic**: Stored versions never decrease
//! - **Bandwidth-efficient**: Only a version summary goes out; only missing
//!   or newer entries come back
//! - **Contained failures**: A broken connection only affects its own round
//!
//! ## Message Flow
//!
//! ```text
//! Node A (active)                     Node B (passive)
//!   |-------- Summary ---------------->|
//!   |<------- Diff --------------------|
//! ```
//!
//! ## Components
//!
//! - [`PeerDirectory`] - one live outbound connection per peer
//! - [`exchange`] / [`serve_passive`] - the two halves of a round
//! - [`Scheduler`] - periodic target selection
//! - [`Transport`] - byte-stream abstraction ([`TcpTransport`], [`MemoryNetwork`])
//! - [`Codec`] - message encoding ([`CborCodec`], [`JsonCodec`])

pub mod codec;
pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod scheduler;
pub mod shutdown;
pub mod transport;

pub use codec::{read_frame, write_frame, CborCodec, Codec, CodecKind, JsonCodec};
pub use config::SyncConfig;
pub use connection::PeerConnection;
pub use directory::PeerDirectory;
pub use error::{Result, SyncError};
pub use messages::{limits, GossipMessage};
pub use protocol::{exchange, serve_passive, RoundReport};
pub use scheduler::{select_targets, target_pool, Scheduler, TickReport};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use transport::{
    memory::MemoryNetwork, memory::MemoryTransport, BoxStream, Listener, TcpTransport, Transport,
};

//! Configuration for gossip behavior.

use std::time::Duration;

use crate::codec::CodecKind;
use crate::messages::limits;

/// Configuration for gossip behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of exchange rounds started per tick.
    pub fan_out: usize,
    /// Time between scheduler ticks.
    pub gossip_interval: Duration,
    /// Deadline for one summary/diff round trip.
    pub round_timeout: Duration,
    /// Deadline for opening a connection to a peer.
    pub connect_timeout: Duration,
    /// Wire codec; every node in a cluster must use the same one.
    pub codec: CodecKind,
    /// Largest frame accepted or sent.
    pub max_frame_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fan_out: 1,
            gossip_interval: Duration::from_millis(50),
            round_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
            codec: CodecKind::Cbor,
            max_frame_bytes: limits::DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl SyncConfig {
    /// Set the fan-out.
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Set the gossip interval.
    pub fn with_gossip_interval(mut self, interval: Duration) -> Self {
        self.gossip_interval = interval;
        self
    }

    /// Set the per-round deadline.
    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = timeout;
        self
    }

    /// Set the dial deadline.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the wire codec.
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    /// Set the frame size limit.
    pub fn with_max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }
}

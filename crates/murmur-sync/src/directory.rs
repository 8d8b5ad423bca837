//! Peer directory: at most one live outbound connection per remote node.
//!
//! The directory has its own lock, independent of the state store's. The
//! lock is never held while dialing. Once shutdown is signalled no new
//! connections are dialed; existing ones close as their last user drops
//! them.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use murmur_core::NodeAddress;

use crate::codec::Codec;
use crate::connection::PeerConnection;
use crate::error::{Result, SyncError};
use crate::shutdown::ShutdownSignal;
use crate::transport::Transport;

/// Outbound connections keyed by peer address.
pub struct PeerDirectory {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    connect_timeout: Duration,
    max_frame_bytes: usize,
    shutdown: ShutdownSignal,
    peers: Mutex<HashMap<NodeAddress, Arc<PeerConnection>>>,
}

impl PeerDirectory {
    /// Create an empty directory that dials through `transport`.
    pub fn new(
        transport: Arc<dyn Transport>,
        codec: Arc<dyn Codec>,
        connect_timeout: Duration,
        max_frame_bytes: usize,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            transport,
            codec,
            connect_timeout,
            max_frame_bytes,
            shutdown,
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live connection to `target`, dialing one if needed.
    ///
    /// A failed dial leaves no entry behind. If two callers dial the same
    /// target concurrently, the first connection recorded wins and the other
    /// is dropped.
    pub async fn get_or_create(&self, target: &NodeAddress) -> Result<Arc<PeerConnection>> {
        if self.shutdown.is_triggered() {
            return Err(SyncError::Cancelled);
        }

        if let Some(conn) = self.peers.lock().await.get(target) {
            if conn.is_open() {
                return Ok(Arc::clone(conn));
            }
        }

        if target.network != self.transport.network() {
            return Err(SyncError::Dial {
                endpoint: target.to_string(),
                reason: format!("transport speaks {}", self.transport.network()),
            });
        }

        let stream = tokio::time::timeout(
            self.connect_timeout,
            self.transport.connect(&target.endpoint),
        )
        .await
        .map_err(|_| SyncError::Timeout(format!("dialing {target}")))??;

        tracing::debug!(%target, "opened connection");
        let conn = Arc::new(PeerConnection::open(
            target.clone(),
            stream,
            Arc::clone(&self.codec),
            self.max_frame_bytes,
        ));

        let mut peers = self.peers.lock().await;
        match peers.entry(target.clone()) {
            Entry::Occupied(existing) if existing.get().is_open() => Ok(Arc::clone(existing.get())),
            Entry::Occupied(mut stale) => {
                stale.insert(Arc::clone(&conn));
                Ok(conn)
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&conn));
                Ok(conn)
            }
        }
    }

    /// Forget the connection to `target`. Returns whether one was recorded.
    ///
    /// The connection closes once the last in-flight user releases it.
    pub async fn remove(&self, target: &NodeAddress) -> bool {
        let removed = self.peers.lock().await.remove(target).is_some();
        if removed {
            tracing::debug!(%target, "pruned connection");
        }
        removed
    }

    /// Whether a connection to `target` is recorded.
    pub async fn contains(&self, target: &NodeAddress) -> bool {
        self.peers.lock().await.contains_key(target)
    }

    /// Number of recorded connections.
    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    /// Whether no connections are recorded.
    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }

    /// Drop every connection.
    pub async fn clear(&self) {
        self.peers.lock().await.clear();
    }
}

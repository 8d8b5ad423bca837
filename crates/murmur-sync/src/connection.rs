//! Outbound peer connections.
//!
//! A [`PeerConnection`] owns the write half of a stream behind a send lock
//! and a background task that decodes everything arriving on the read half.
//! Decoded messages are queued for whoever is running a round on the
//! connection. When the receive task ends, for any reason, the queue closes
//! and the next round fails with [`SyncError::ConnectionClosed`].
//!
//! The receive task lives exactly as long as the connection: dropping the
//! last handle aborts it. A round already in flight therefore finishes even
//! if the node is stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use murmur_core::NodeAddress;

use crate::codec::{read_frame, write_frame, Codec};
use crate::error::{Result, SyncError};
use crate::messages::GossipMessage;
use crate::transport::BoxStream;

/// Messages buffered between the receive task and a round.
const INBOX_CAPACITY: usize = 16;

/// One live outbound connection to a peer.
pub struct PeerConnection {
    target: NodeAddress,
    codec: Arc<dyn Codec>,
    max_frame_bytes: usize,
    /// Send lock: one frame at a time.
    writer: Mutex<WriteHalf<BoxStream>>,
    /// Round lock: held for a whole request/response so rounds never overlap.
    inbox: Mutex<mpsc::Receiver<GossipMessage>>,
    receiver: JoinHandle<()>,
}

impl PeerConnection {
    /// Wrap an open stream and start its receive task.
    pub fn open(
        target: NodeAddress,
        stream: BoxStream,
        codec: Arc<dyn Codec>,
        max_frame_bytes: usize,
    ) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);

        let receiver = tokio::spawn(receive_loop(
            target.clone(),
            read_half,
            Arc::clone(&codec),
            max_frame_bytes,
            tx,
        ));

        Self {
            target,
            codec,
            max_frame_bytes,
            writer: Mutex::new(write_half),
            inbox: Mutex::new(rx),
            receiver,
        }
    }

    /// The peer this connection is bound to.
    pub fn target(&self) -> &NodeAddress {
        &self.target
    }

    /// Whether the receive task is still running.
    pub fn is_open(&self) -> bool {
        !self.receiver.is_finished()
    }

    /// Send one message.
    pub async fn send(&self, message: &GossipMessage) -> Result<()> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, self.codec.as_ref(), message, self.max_frame_bytes).await
    }

    /// Send `message` and wait for the next message from the peer.
    ///
    /// `timeout` bounds the whole round trip, writing included. A timed-out
    /// send can leave a partial frame on the stream, so callers must drop
    /// the connection after any error. Anything left over from an earlier,
    /// abandoned round is discarded first.
    pub async fn request(&self, message: &GossipMessage, timeout: Duration) -> Result<GossipMessage> {
        let mut inbox = self.inbox.lock().await;
        while let Ok(stale) = inbox.try_recv() {
            tracing::debug!(target = %self.target, kind = stale.kind(), "discarding stale reply");
        }

        tokio::time::timeout(timeout, self.round_trip(&mut inbox, message))
            .await
            .map_err(|_| SyncError::Timeout(format!("round trip with {}", self.target)))?
    }

    async fn round_trip(
        &self,
        inbox: &mut mpsc::Receiver<GossipMessage>,
        message: &GossipMessage,
    ) -> Result<GossipMessage> {
        self.send(message).await?;
        inbox.recv().await.ok_or(SyncError::ConnectionClosed)
    }
}

impl Drop for PeerConnection {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

async fn receive_loop(
    target: NodeAddress,
    mut reader: ReadHalf<BoxStream>,
    codec: Arc<dyn Codec>,
    max_frame_bytes: usize,
    inbox: mpsc::Sender<GossipMessage>,
) {
    loop {
        match read_frame(&mut reader, codec.as_ref(), max_frame_bytes).await {
            Ok(Some(message)) => {
                if inbox.send(message).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(%target, "peer closed connection");
                break;
            }
            Err(e) => {
                tracing::warn!(%target, error = %e, "receive failed, dropping connection");
                break;
            }
        }
    }
}

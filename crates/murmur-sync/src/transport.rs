//! Transport abstraction for the gossip protocol.
//!
//! The transport layer only provides reliable, ordered byte streams.
//! Framing and encoding live in [`crate::codec`]. Closing a stream is
//! dropping it.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{Result, SyncError};

/// A bidirectional byte stream.
pub trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

/// Boxed stream handed out by transports.
pub type BoxStream = Box<dyn AsyncStream>;

/// Transport trait for opening and accepting connections.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport kind; becomes the `network` half of a node's address.
    fn network(&self) -> &str;

    /// Open a connection to `endpoint`.
    async fn connect(&self, endpoint: &str) -> Result<BoxStream>;

    /// Start listening on `endpoint`.
    async fn bind(&self, endpoint: &str) -> Result<Box<dyn Listener>>;
}

/// A bound endpoint accepting inbound connections.
#[async_trait]
pub trait Listener: Send {
    /// Wait for the next inbound connection.
    ///
    /// Returns the stream and a description of the remote end.
    async fn accept(&mut self) -> Result<(BoxStream, String)>;

    /// The endpoint this listener is bound to.
    fn local_endpoint(&self) -> String;
}

/// TCP transport over tokio sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl TcpTransport {
    /// Network name used in addresses.
    pub const NETWORK: &'static str = "tcp";
}

#[async_trait]
impl Transport for TcpTransport {
    fn network(&self) -> &str {
        Self::NETWORK
    }

    async fn connect(&self, endpoint: &str) -> Result<BoxStream> {
        let stream = TcpStream::connect(endpoint)
            .await
            .map_err(|e| SyncError::Dial {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }

    async fn bind(&self, endpoint: &str) -> Result<Box<dyn Listener>> {
        let listener = TcpListener::bind(endpoint).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                SyncError::AddressInUse(endpoint.to_string())
            } else {
                SyncError::Io(e)
            }
        })?;
        Ok(Box::new(TcpAcceptor {
            listener,
            endpoint: endpoint.to_string(),
        }))
    }
}

struct TcpAcceptor {
    listener: TcpListener,
    endpoint: String,
}

#[async_trait]
impl Listener for TcpAcceptor {
    async fn accept(&mut self) -> Result<(BoxStream, String)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((Box::new(stream), peer.to_string()))
    }

    fn local_endpoint(&self) -> String {
        self.listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| self.endpoint.clone())
    }
}

/// A simple in-memory transport for testing.
///
/// Uses duplex pipes to simulate stream connections between nodes.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::io::DuplexStream;
    use tokio::sync::{mpsc, RwLock};

    /// Pipe capacity per direction.
    const PIPE_CAPACITY: usize = 64 * 1024;

    /// Pending connections queued per listener.
    const BACKLOG: usize = 128;

    type Incoming = (DuplexStream, String);

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        /// Accept queues for each bound endpoint.
        listeners: RwLock<HashMap<String, mpsc::Sender<Incoming>>>,
        /// Source of unique names for dialing ends.
        next_conn: AtomicU64,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport attached to this network.
        pub fn transport(self: &Arc<Self>) -> MemoryTransport {
            MemoryTransport {
                network: Arc::clone(self),
            }
        }

        /// Whether something is currently listening on `endpoint`.
        pub async fn is_bound(&self, endpoint: &str) -> bool {
            self.listeners
                .read()
                .await
                .get(endpoint)
                .is_some_and(|tx| !tx.is_closed())
        }
    }

    /// In-memory transport implementation.
    #[derive(Clone)]
    pub struct MemoryTransport {
        network: Arc<MemoryNetwork>,
    }

    impl MemoryTransport {
        /// Network name used in addresses.
        pub const NETWORK: &'static str = "memory";
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        fn network(&self) -> &str {
            Self::NETWORK
        }

        async fn connect(&self, endpoint: &str) -> Result<BoxStream> {
            let refused = || SyncError::Dial {
                endpoint: endpoint.to_string(),
                reason: "connection refused".into(),
            };

            let sender = self
                .network
                .listeners
                .read()
                .await
                .get(endpoint)
                .cloned()
                .ok_or_else(refused)?;

            let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
            let id = self.network.next_conn.fetch_add(1, Ordering::Relaxed);
            if sender.send((remote, format!("memory-conn-{id}"))).await.is_err() {
                // Listener was dropped; forget it so the endpoint can be rebound.
                self.network.listeners.write().await.remove(endpoint);
                return Err(refused());
            }
            Ok(Box::new(local))
        }

        async fn bind(&self, endpoint: &str) -> Result<Box<dyn Listener>> {
            let mut listeners = self.network.listeners.write().await;
            if listeners.get(endpoint).is_some_and(|tx| !tx.is_closed()) {
                return Err(SyncError::AddressInUse(endpoint.to_string()));
            }

            let (tx, rx) = mpsc::channel(BACKLOG);
            listeners.insert(endpoint.to_string(), tx);
            Ok(Box::new(MemoryListener {
                endpoint: endpoint.to_string(),
                incoming: rx,
            }))
        }
    }

    /// Accepting end of a memory endpoint. Dropping it unbinds the endpoint.
    pub struct MemoryListener {
        endpoint: String,
        incoming: mpsc::Receiver<Incoming>,
    }

    #[async_trait]
    impl Listener for MemoryListener {
        async fn accept(&mut self) -> Result<(BoxStream, String)> {
            match self.incoming.recv().await {
                Some((stream, peer)) => Ok((Box::new(stream), peer)),
                None => Err(SyncError::ConnectionClosed),
            }
        }

        fn local_endpoint(&self) -> String {
            self.endpoint.clone()
        }
    }
}

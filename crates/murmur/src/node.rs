//! The Node: unified API for a Murmur participant.
//!
//! A node owns its state store, listens for peers' summaries, and runs the
//! gossip scheduler that pulls from randomly chosen peers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use murmur_core::{exclude_address, NodeAddress, Snapshot, VersionedValue};
use murmur_store::StateStore;
use murmur_sync::{
    exchange, serve_passive, shutdown_channel, Codec, Listener, PeerDirectory, RoundReport,
    Scheduler, ShutdownSignal, ShutdownTrigger, SyncConfig, SyncError, TcpTransport, Transport,
};

use crate::error::{NodeError, Result};

/// Pause after a transient accept failure.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Configuration for a Node.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Gossip configuration.
    pub sync: SyncConfig,
}

impl NodeConfig {
    /// Use the given gossip configuration.
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }
}

/// Background machinery that exists between `start` and `shutdown`.
struct Running {
    trigger: ShutdownTrigger,
    directory: Arc<PeerDirectory>,
    accept: JoinHandle<()>,
    scheduler: JoinHandle<()>,
}

/// The main Node struct.
///
/// Provides a unified API for:
/// - Publishing local facts
/// - Reading the merged cluster view
/// - Starting and stopping gossip
pub struct Node {
    state: Arc<StateStore>,
    transport: Arc<dyn Transport>,
    seeds: Vec<NodeAddress>,
    config: NodeConfig,
    running: Mutex<Option<Running>>,
}

impl Node {
    /// Create a node listening on `endpoint` of `transport`.
    ///
    /// The node's own endpoint is removed from `seeds`.
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        seeds: &[String],
        config: NodeConfig,
    ) -> Self {
        let endpoint = endpoint.into();
        let network = transport.network().to_string();
        let seeds = exclude_address(seeds, &endpoint)
            .into_iter()
            .map(|seed| NodeAddress::new(network.clone(), seed))
            .collect();

        Self {
            state: Arc::new(StateStore::new(NodeAddress::new(network, endpoint))),
            transport,
            seeds,
            config,
            running: Mutex::new(None),
        }
    }

    /// Create a node on the TCP transport.
    pub fn tcp(endpoint: impl Into<String>, seeds: &[String], config: NodeConfig) -> Self {
        Self::new(Arc::new(TcpTransport), endpoint, seeds, config)
    }

    /// This node's address.
    pub fn local_address(&self) -> &NodeAddress {
        self.state.local_address()
    }

    /// Seeds used while no peer is known, self excluded.
    pub fn seeds(&self) -> &[NodeAddress] {
        &self.seeds
    }

    /// The node's configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Publish a local fact. Returns the version assigned to it.
    ///
    /// The fact is picked up by peers on their next round against this node
    /// or against anyone who already pulled it.
    pub fn publish(&self, key: impl Into<String>, value: impl Into<String>) -> u64 {
        self.state.publish(key, value)
    }

    /// A deep copy of everything this node currently knows.
    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    /// Look up one fact published by `address`.
    pub fn get(&self, address: &NodeAddress, key: &str) -> Option<VersionedValue> {
        self.state.get(address, key)
    }

    /// Look up one fact by the textual address `network://endpoint`.
    pub fn lookup(&self, address: &str, key: &str) -> Result<Option<VersionedValue>> {
        let address: NodeAddress = address.parse()?;
        Ok(self.state.get(&address, key))
    }

    /// Every known peer address, self excluded.
    pub fn known_peers(&self) -> Vec<NodeAddress> {
        self.state.known_peers()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Bind the listening endpoint, start answering peers, and start the
    /// gossip scheduler.
    ///
    /// The node advertises the endpoint it was created with, so that
    /// endpoint must be dialable as written; port 0 is refused. A bind
    /// failure is returned; nothing is left running in that case.
    pub async fn start(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(NodeError::AlreadyStarted);
        }

        let endpoint = self.local_address().endpoint.clone();
        if is_ephemeral(&endpoint) {
            return Err(NodeError::EphemeralEndpoint(endpoint));
        }
        let listener = self
            .transport
            .bind(&endpoint)
            .await
            .map_err(|source| NodeError::Bind { endpoint, source })?;
        tracing::info!(
            local = %self.local_address(),
            bound = %listener.local_endpoint(),
            seeds = self.seeds.len(),
            "gossip node started"
        );

        let sync = &self.config.sync;
        let (trigger, signal) = shutdown_channel();
        let codec = sync.codec.build();

        let directory = Arc::new(PeerDirectory::new(
            Arc::clone(&self.transport),
            Arc::clone(&codec),
            sync.connect_timeout,
            sync.max_frame_bytes,
            signal.clone(),
        ));

        let accept = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.state),
            codec,
            sync.clone(),
            signal.clone(),
        ));

        let scheduler = Scheduler::new(
            Arc::clone(&self.state),
            Arc::clone(&directory),
            self.seeds.clone(),
            sync.clone(),
        );
        let scheduler = tokio::spawn(async move { scheduler.run(signal).await });

        *running = Some(Running {
            trigger,
            directory,
            accept,
            scheduler,
        });
        Ok(())
    }

    /// Whether `start` has succeeded and `shutdown` has not been called.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Run one active round against `target` right now, outside the
    /// scheduler. A failed round prunes the target like a scheduled one.
    pub async fn gossip_with(&self, target: &NodeAddress) -> Result<RoundReport> {
        let directory = match self.running.lock().await.as_ref() {
            Some(running) => Arc::clone(&running.directory),
            None => return Err(NodeError::NotRunning),
        };

        let round = match directory.get_or_create(target).await {
            Ok(conn) => exchange(&conn, &self.state, self.config.sync.round_timeout).await,
            Err(e) => Err(e),
        };
        match round {
            Ok(report) => Ok(report),
            Err(e) => {
                directory.remove(target).await;
                Err(e.into())
            }
        }
    }

    /// Stop the scheduler, the listener, and every connection task.
    ///
    /// A gossip tick in progress finishes first. Calling this on a node that
    /// is not running does nothing.
    pub async fn shutdown(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };

        running.trigger.trigger();
        if let Err(e) = running.scheduler.await {
            tracing::warn!(error = %e, "scheduler task ended abnormally");
        }
        if let Err(e) = running.accept.await {
            tracing::warn!(error = %e, "accept task ended abnormally");
        }
        running.directory.clear().await;

        tracing::info!(local = %self.local_address(), "gossip node stopped");
    }
}

/// Whether `endpoint` names port 0.
fn is_ephemeral(endpoint: &str) -> bool {
    endpoint
        .rsplit_once(':')
        .is_some_and(|(_, port)| port == "0")
}

async fn accept_loop(
    mut listener: Box<dyn Listener>,
    state: Arc<StateStore>,
    codec: Arc<dyn Codec>,
    config: SyncConfig,
    mut shutdown: ShutdownSignal,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.triggered() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "accepted connection");
                let state = Arc::clone(&state);
                let codec = Arc::clone(&codec);
                let config = config.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    match serve_passive(stream, &peer, state, codec, &config, shutdown).await {
                        Ok(served) => tracing::trace!(%peer, served, "passive connection ended"),
                        Err(e) => {
                            tracing::warn!(%peer, error = %e, "passive connection failed")
                        }
                    }
                });
            }
            Err(SyncError::ConnectionClosed) => {
                tracing::warn!("listener closed, no longer accepting");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_sync::MemoryNetwork;

    fn seeds(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_strips_self_from_seeds() {
        let network = MemoryNetwork::new();
        let node = Node::new(
            Arc::new(network.transport()),
            "a",
            &seeds(&["a", "b", "c", "a"]),
            NodeConfig::default(),
        );

        assert_eq!(node.local_address(), &NodeAddress::new("memory", "a"));
        assert_eq!(
            node.seeds(),
            &[NodeAddress::new("memory", "b"), NodeAddress::new("memory", "c")]
        );
    }

    #[test]
    fn test_new_node_has_own_empty_entry() {
        let node = Node::tcp("127.0.0.1:1", &[], NodeConfig::default());
        let snapshot = node.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[node.local_address()].is_empty());
        assert!(node.known_peers().is_empty());
    }

    #[test]
    fn test_publish_versions() {
        let node = Node::tcp("127.0.0.1:1", &[], NodeConfig::default());
        assert_eq!(node.publish("x", "1"), 1);
        assert_eq!(node.publish("x", "2"), 2);
        assert_eq!(node.get(node.local_address(), "x").unwrap().value, "2");

        let found = node.lookup("tcp://127.0.0.1:1", "x").unwrap().unwrap();
        assert_eq!(found.version, 2);
        assert!(node.lookup("tcp://127.0.0.1:1", "missing").unwrap().is_none());
        assert!(matches!(
            node.lookup("not-an-address", "x"),
            Err(NodeError::Core(_))
        ));
    }

    #[test]
    fn test_is_ephemeral() {
        assert!(is_ephemeral("127.0.0.1:0"));
        assert!(is_ephemeral("[::1]:0"));
        assert!(!is_ephemeral("127.0.0.1:20000"));
        assert!(!is_ephemeral("127.0.0.1:10"));
        assert!(!is_ephemeral("node-a"));
    }

    #[tokio::test]
    async fn test_port_zero_is_refused() {
        let node = Node::tcp("127.0.0.1:0", &[], NodeConfig::default());
        assert!(matches!(
            node.start().await,
            Err(NodeError::EphemeralEndpoint(ref e)) if e == "127.0.0.1:0"
        ));
        assert!(!node.is_running().await);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let network = MemoryNetwork::new();
        let node = Node::new(Arc::new(network.transport()), "a", &[], NodeConfig::default());

        node.start().await.unwrap();
        assert!(matches!(node.start().await, Err(NodeError::AlreadyStarted)));
        node.shutdown().await;
        assert!(!node.is_running().await);
    }

    #[tokio::test]
    async fn test_gossip_with_requires_running() {
        let network = MemoryNetwork::new();
        let node = Node::new(Arc::new(network.transport()), "a", &[], NodeConfig::default());

        let err = node
            .gossip_with(&NodeAddress::new("memory", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::NotRunning));
    }
}

//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: clusters of running nodes on a
//! private in-memory network.

use std::sync::Arc;
use std::time::Duration;

use murmur::{MemoryNetwork, Node, NodeConfig, SyncConfig};

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Running nodes `n0..n{N-1}` on one memory network.
///
/// `n0` has no seeds; every other node is seeded with `n0` only.
pub struct Cluster {
    network: Arc<MemoryNetwork>,
    nodes: Vec<Node>,
}

impl Cluster {
    /// Endpoint name of the node at `index`.
    pub fn endpoint(index: usize) -> String {
        format!("n{index}")
    }

    /// Config that ticks every 10ms.
    pub fn fast_config() -> NodeConfig {
        NodeConfig::default()
            .with_sync(SyncConfig::default().with_gossip_interval(Duration::from_millis(10)))
    }

    /// Build and start `size` nodes.
    ///
    /// Panics if any node fails to start.
    pub async fn start(size: usize, config: NodeConfig) -> Self {
        let network = MemoryNetwork::new();
        let hub = vec![Self::endpoint(0)];

        let mut nodes = Vec::with_capacity(size);
        for i in 0..size {
            let seeds: &[String] = if i == 0 { &[] } else { &hub };
            let node = Node::new(
                Arc::new(network.transport()),
                Self::endpoint(i),
                seeds,
                config.clone(),
            );
            node.start().await.expect("cluster node failed to start");
            nodes.push(node);
        }

        Self { network, nodes }
    }

    /// The shared network.
    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.network
    }

    /// The node at `index`.
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// All nodes, in index order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// True when every node holds the same view.
    pub fn is_converged(&self) -> bool {
        let Some((first, rest)) = self.nodes.split_first() else {
            return true;
        };
        let reference = first.snapshot();
        reference.len() == self.nodes.len() && rest.iter().all(|n| n.snapshot() == reference)
    }

    /// Poll until `check` holds or `timeout` elapses. Returns the final result.
    pub async fn wait_until<F>(&self, timeout: Duration, check: F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if check(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check(self)
    }

    /// Wait for [`Cluster::is_converged`].
    pub async fn wait_for_convergence(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, Self::is_converged).await
    }

    /// Stop every node.
    pub async fn shutdown(&self) {
        for node in &self.nodes {
            node.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cluster_seeds_hub() {
        let cluster = Cluster::start(3, Cluster::fast_config()).await;

        assert!(cluster.node(0).seeds().is_empty());
        assert_eq!(cluster.node(2).seeds().len(), 1);
        assert_eq!(cluster.node(2).seeds()[0].endpoint, "n0");
        for i in 0..3 {
            assert!(cluster.network().is_bound(&Cluster::endpoint(i)).await);
        }

        cluster.shutdown().await;
        assert!(!cluster.network().is_bound("n0").await);
    }

    #[tokio::test]
    async fn test_empty_cluster_is_converged() {
        let cluster = Cluster::start(0, Cluster::fast_config()).await;
        assert!(cluster.is_converged());
    }
}

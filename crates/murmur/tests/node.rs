//! End-to-end behavior of a Node over the in-memory and TCP transports.

use std::sync::Arc;
use std::time::Duration;

use murmur::sync::{write_frame, CborCodec, GossipMessage, Transport};
use murmur::{
    CodecKind, MemoryNetwork, Node, NodeAddress, NodeConfig, NodeError, SyncConfig, TcpTransport,
};
use tokio::io::AsyncWriteExt;

/// Config whose scheduler only ticks once, at start.
fn manual_config() -> NodeConfig {
    NodeConfig::default()
        .with_sync(SyncConfig::default().with_gossip_interval(Duration::from_secs(3600)))
}

fn fast_config() -> NodeConfig {
    NodeConfig::default()
        .with_sync(SyncConfig::default().with_gossip_interval(Duration::from_millis(10)))
}

fn memory_node(network: &Arc<MemoryNetwork>, endpoint: &str, seeds: &[&str], config: NodeConfig) -> Node {
    let seeds: Vec<String> = seeds.iter().map(|s| s.to_string()).collect();
    Node::new(Arc::new(network.transport()), endpoint, &seeds, config)
}

async fn wait_until<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn free_tcp_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

#[tokio::test]
async fn test_pull_missing_then_newer() {
    let network = MemoryNetwork::new();
    let a = memory_node(&network, "a", &[], manual_config());
    let b = memory_node(&network, "b", &[], manual_config());
    a.start().await.unwrap();
    b.start().await.unwrap();

    assert_eq!(a.publish("x", "1"), 1);

    let first = b.gossip_with(a.local_address()).await.unwrap();
    assert_eq!(first.adopted, 1);
    let view = b.snapshot();
    let from_a = &view[a.local_address()];
    assert_eq!(from_a.len(), 1);
    assert_eq!(from_a["x"].version, 1);
    assert_eq!(from_a["x"].value, "1");

    assert_eq!(a.publish("x", "2"), 2);
    let second = b.gossip_with(a.local_address()).await.unwrap();
    assert_eq!(second.entries_received, 1);
    assert_eq!(b.get(a.local_address(), "x").unwrap().value, "2");

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_noop_round_when_up_to_date() {
    let network = MemoryNetwork::new();
    let a = memory_node(&network, "a", &[], manual_config());
    let b = memory_node(&network, "b", &[], manual_config());
    a.start().await.unwrap();
    b.start().await.unwrap();

    a.publish("x", "1");
    a.publish("y", "2");
    b.gossip_with(a.local_address()).await.unwrap();
    let before = b.snapshot();

    let again = b.gossip_with(a.local_address()).await.unwrap();
    assert_eq!(again.entries_received, 0);
    assert_eq!(again.adopted, 0);
    assert_eq!(b.snapshot(), before);

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_passive_side_does_not_learn_values() {
    let network = MemoryNetwork::new();
    let a = memory_node(&network, "a", &[], manual_config());
    let b = memory_node(&network, "b", &[], manual_config());
    a.start().await.unwrap();
    b.start().await.unwrap();

    b.publish("only-on-b", "v");
    b.gossip_with(a.local_address()).await.unwrap();

    assert!(wait_until(Duration::from_secs(1), || a.known_peers() == vec![b.local_address().clone()]).await);
    assert!(a.get(b.local_address(), "only-on-b").is_none());

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_two_nodes_converge_via_scheduler() {
    let network = MemoryNetwork::new();
    let a = memory_node(&network, "a", &["b"], fast_config());
    let b = memory_node(&network, "b", &["a"], fast_config());
    a.start().await.unwrap();
    b.start().await.unwrap();

    a.publish("color", "red");
    b.publish("shape", "square");

    let converged = wait_until(Duration::from_secs(5), || {
        a.get(b.local_address(), "shape").is_some() && b.get(a.local_address(), "color").is_some()
    })
    .await;
    assert!(converged, "nodes did not exchange facts");

    a.publish("color", "blue");
    let updated = wait_until(Duration::from_secs(5), || {
        b.get(a.local_address(), "color").map(|v| v.value) == Some("blue".to_string())
    })
    .await;
    assert!(updated, "update did not propagate");

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_json_codec_cluster() {
    let network = MemoryNetwork::new();
    let config = NodeConfig::default().with_sync(
        SyncConfig::default()
            .with_gossip_interval(Duration::from_millis(10))
            .with_codec(CodecKind::Json),
    );
    let a = memory_node(&network, "a", &["b"], config.clone());
    let b = memory_node(&network, "b", &["a"], config);
    a.start().await.unwrap();
    b.start().await.unwrap();

    a.publish("k", "v");
    assert!(wait_until(Duration::from_secs(5), || b.get(a.local_address(), "k").is_some()).await);

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let network = MemoryNetwork::new();
    let first = memory_node(&network, "shared", &[], manual_config());
    let second = memory_node(&network, "shared", &[], manual_config());

    first.start().await.unwrap();
    let err = second.start().await.unwrap_err();
    assert!(matches!(err, NodeError::Bind { ref endpoint, .. } if endpoint == "shared"));
    assert!(!second.is_running().await);

    first.shutdown().await;
}

#[tokio::test]
async fn test_tcp_bind_failure_is_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = occupied.local_addr().unwrap().to_string();

    let node = Node::tcp(endpoint, &[], manual_config());
    assert!(matches!(node.start().await, Err(NodeError::Bind { .. })));
}

#[tokio::test]
async fn test_unreachable_peer_is_pruned_and_node_keeps_running() {
    let network = MemoryNetwork::new();
    let a = memory_node(&network, "a", &[], manual_config());
    let b = memory_node(&network, "b", &[], manual_config());
    a.start().await.unwrap();
    b.start().await.unwrap();

    a.publish("x", "1");
    b.gossip_with(a.local_address()).await.unwrap();

    a.shutdown().await;
    assert!(!network.is_bound("a").await);

    // The old connection is dead and redialing is refused.
    let mut failed = false;
    for _ in 0..3 {
        if b.gossip_with(a.local_address()).await.is_err() {
            failed = true;
            break;
        }
    }
    assert!(failed);
    assert_eq!(b.get(a.local_address(), "x").unwrap().value, "1");

    // Restarting brings it back.
    a.start().await.unwrap();
    a.publish("x", "2");
    b.gossip_with(a.local_address()).await.unwrap();
    assert_eq!(b.get(a.local_address(), "x").unwrap().value, "2");

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_garbage_connection_does_not_disturb_node() {
    let network = MemoryNetwork::new();
    let a = memory_node(&network, "a", &[], manual_config());
    let b = memory_node(&network, "b", &[], manual_config());
    a.start().await.unwrap();
    b.start().await.unwrap();
    a.publish("x", "1");

    let transport = network.transport();
    let mut rogue = transport.connect("a").await.unwrap();
    rogue.write_all(&[0, 0, 0, 3, 0xff, 0xff, 0xff]).await.unwrap();

    let mut rogue_diff = transport.connect("a").await.unwrap();
    let bogus = GossipMessage::Diff {
        entries: Default::default(),
    };
    write_frame(&mut rogue_diff, &CborCodec, &bogus, 1024).await.unwrap();

    b.gossip_with(a.local_address()).await.unwrap();
    assert_eq!(b.get(a.local_address(), "x").unwrap().value, "1");
    assert!(a.is_running().await);

    a.shutdown().await;
    b.shutdown().await;
}

#[tokio::test]
async fn test_snapshot_is_a_copy() {
    let network = MemoryNetwork::new();
    let a = memory_node(&network, "a", &[], manual_config());
    a.publish("x", "1");

    let mut view = a.snapshot();
    view.clear();
    view.insert(NodeAddress::new("memory", "fake"), Default::default());

    assert!(a.known_peers().is_empty());
    assert_eq!(a.get(a.local_address(), "x").unwrap().value, "1");
}

#[tokio::test]
async fn test_tcp_nodes_converge() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let ep_a = free_tcp_endpoint();
    let ep_b = free_tcp_endpoint();

    let a = Node::new(Arc::new(TcpTransport), ep_a.clone(), &[ep_b.clone()], fast_config());
    let b = Node::tcp(ep_b.clone(), &[ep_a.clone(), ep_b.clone()], fast_config());
    assert_eq!(b.seeds(), &[NodeAddress::new("tcp", ep_a.clone())]);

    a.start().await.unwrap();
    b.start().await.unwrap();

    a.publish("a", "b");
    let converged = wait_until(Duration::from_secs(10), || {
        b.lookup(&format!("tcp://{ep_a}"), "a").ok().flatten().is_some()
    })
    .await;
    assert!(converged, "tcp nodes did not converge");

    a.shutdown().await;
    b.shutdown().await;
}

//! End-to-end gossip dissemination scenarios.
//!
//! Each test wires up a small swarm of nodes over the in-memory fake
//! transport and exercises one property the protocol must hold: flooding
//! reaches every node, TTL bounds the number of hops, redundant pushes
//! dedup to a single delivery, a stale peer gets expired by the failure
//! detector, a message that skipped a node repairs via IHAVE/IWANT, and a
//! HELLO without valid proof-of-work is rejected.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gossip_protocol::network::node::{Node, NodeConfig};
use gossip_protocol::network::transport::fake::FakeNetwork;
use gossip_protocol::network::{Envelope, MsgType};

fn addr(port: u16) -> SocketAddr {
    format!("127.0.0.1:{port}").parse().unwrap()
}

fn base_config(port: u16) -> NodeConfig {
    NodeConfig {
        port,
        fanout: 3,
        ttl: 4,
        peer_limit: 20,
        ping_interval_ms: 2000,
        peer_timeout_ms: 6000,
        pull_interval_ms: 0,
        max_ihave_ids: 32,
        pow_difficulty: 0,
        seed: port as u64,
        bootstrap: None,
    }
}

fn spawn_node(net: &FakeNetwork, port: u16, config: NodeConfig) -> Arc<Node> {
    let transport = net.register(addr(port));
    Arc::new(Node::new(format!("node-{port}"), config, transport, None).unwrap())
}

async fn drain(nodes: &[Arc<Node>], rounds: usize) {
    for _ in 0..rounds {
        for node in nodes {
            while let Ok(Some((bytes, from))) =
                node.transport.recv_timeout(Duration::from_millis(5)).await
            {
                let _ = node.handle_datagram(&bytes, from).await;
            }
        }
    }
}

fn fully_meshed(nodes: &[Arc<Node>]) {
    for (i, a) in nodes.iter().enumerate() {
        for (j, b) in nodes.iter().enumerate() {
            if i != j {
                a.view.touch_or_add(b.self_addr);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// S1: two-node single-hop flood
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_hop_flood_reaches_direct_peer() {
    let net = FakeNetwork::new();
    let a = spawn_node(&net, 20001, base_config(20001));
    let b = spawn_node(&net, 20002, base_config(20002));
    fully_meshed(&[a.clone(), b.clone()]);

    a.inject_gossip(serde_json::json!({"msg": "hello"})).await.unwrap();
    drain(&[a.clone(), b.clone()], 3).await;

    assert_eq!(b.seen_count(), 1);
}

// ---------------------------------------------------------------------------
// S2: multi-hop TTL chain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ttl_bounds_propagation_depth() {
    let net = FakeNetwork::new();
    // Chain topology: 0 -- 1 -- 2 -- 3 -- 4, each node only knows its
    // immediate neighbors, so dissemination must hop node to node.
    let ports = [20010u16, 20011, 20012, 20013, 20014];

    let nodes: Vec<Arc<Node>> = ports
        .iter()
        .map(|p| {
            let mut c = base_config(*p);
            c.ttl = 2;
            c.fanout = 1;
            spawn_node(&net, *p, c)
        })
        .collect();

    for w in nodes.windows(2) {
        w[0].view.touch_or_add(w[1].self_addr);
        w[1].view.touch_or_add(w[0].self_addr);
    }

    nodes[0]
        .inject_gossip(serde_json::json!({"hop": 0}))
        .await
        .unwrap();
    drain(&nodes, 6).await;

    // ttl=2 means the message can travel at most 2 hops from the origin:
    // node 0 (origin) -> node 1 -> node 2. Node 3 and 4 must not see it.
    assert_eq!(nodes[1].seen_count(), 1, "one hop away must receive it");
    assert_eq!(nodes[2].seen_count(), 1, "two hops away must receive it");
    assert_eq!(nodes[3].seen_count(), 0, "three hops away must not receive it");
    assert_eq!(nodes[4].seen_count(), 0, "four hops away must not receive it");
}

// ---------------------------------------------------------------------------
// S3: dedup under redundant push in a triangle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn triangle_topology_dedups_redundant_relays() {
    let net = FakeNetwork::new();
    let nodes: Vec<Arc<Node>> = [20020u16, 20021, 20022]
        .iter()
        .map(|p| spawn_node(&net, *p, base_config(*p)))
        .collect();
    fully_meshed(&nodes);

    nodes[0]
        .inject_gossip(serde_json::json!({"triangle": true}))
        .await
        .unwrap();
    drain(&nodes, 6).await;

    // Every node sees the message exactly once regardless of how many
    // redundant copies the full mesh delivers.
    assert_eq!(nodes[1].seen_count(), 1);
    assert_eq!(nodes[2].seen_count(), 1);
}

// ---------------------------------------------------------------------------
// S4: failure detection expires a stale peer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_peer_is_expired_from_the_view() {
    let net = FakeNetwork::new();
    let a = spawn_node(&net, 20030, base_config(20030));
    let stale_addr = addr(20031);
    a.view.touch_or_add(stale_addr);
    assert_eq!(a.view.count(), 1);

    // Let at least one millisecond elapse so the peer is provably stale
    // relative to a zero timeout.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let expired = a.view.expire(0);
    assert_eq!(expired, vec![stale_addr]);
    assert_eq!(a.view.count(), 0);
}

// ---------------------------------------------------------------------------
// S5: pull repair via IHAVE/IWANT
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pull_reconciliation_repairs_a_missed_message() {
    let net = FakeNetwork::new();
    let mut cfg = base_config(20040);
    cfg.ttl = 0; // disable push relay so only the pull path can deliver it
    let a = spawn_node(&net, 20040, cfg.clone());
    let b = spawn_node(&net, 20041, base_config(20041));
    fully_meshed(&[a.clone(), b.clone()]);

    // `a` learns a message (e.g. injected with ttl 0, so push relay never
    // reaches `b`) but `b` never receives it through the normal flood path.
    let msg_id = a
        .inject_gossip(serde_json::json!({"missed": true}))
        .await
        .unwrap();
    drain(&[a.clone(), b.clone()], 2).await;
    assert_eq!(b.seen_count(), 0, "push path must not have delivered it");

    // `a` announces IHAVE, `b` requests it back via IWANT, `a` replies with
    // the stored envelope.
    a.announce_ihave().await.unwrap();
    drain(&[a.clone(), b.clone()], 4).await;

    assert_eq!(b.seen_count(), 1, "pull path should repair the gap");
    assert!(b.store_count() >= 1);
    let _ = msg_id;
}

// ---------------------------------------------------------------------------
// S6: PoW admission rejects an unproven HELLO
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hello_without_valid_pow_is_rejected() {
    let net = FakeNetwork::new();
    let mut cfg = base_config(20050);
    cfg.pow_difficulty = 2;
    let gatekeeper = spawn_node(&net, 20050, cfg);
    let sender: SocketAddr = addr(20051);

    let hello = Envelope::new(
        "HELLO_unproven",
        MsgType::Hello,
        "unproven-node",
        sender.to_string(),
        0,
        1,
        serde_json::json!({"capabilities": ["udp"], "pow": null}),
    );

    let err = gatekeeper.handle_datagram(
        &gossip_protocol::network::encode(&hello).unwrap(),
        sender,
    )
    .await;

    assert!(err.is_err(), "HELLO with no proof-of-work must be rejected");
    assert_eq!(gatekeeper.view.count(), 0, "rejected sender must not enter the view");
}

//! # Node
//!
//! The single owner of all per-node state: identity, configuration,
//! membership view, seen-set, gossip store, transport, and event sink.
//! Lifecycle mirrors the reference's `node_init` / `node_bootstrap` /
//! `node_run` / `node_cleanup` sequence, and the teacher's
//! `ValidatorNode` lifecycle shape (`new` / `start` / `stop`).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::codec::{self, CodecError};
use super::membership::{MembershipView, TouchResult};
use super::messages::{
    Envelope, GetPeersPayload, HelloPayload, IHavePayload, IWantPayload, MsgType, PeerAddr,
    PeersListPayload, PingPayload, PongPayload, PowCredential,
};
use super::pow;
use super::seen::SeenSet;
use super::sink::{EventSink, SinkError, SinkEvent};
use super::store::GossipStore;
use super::transport::{Transport, TransportError};

/// Frozen-at-init configuration for a node. See the CLI surface in
/// `node/src/cli.rs` for how these are populated in the binary.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub port: u16,
    pub fanout: usize,
    pub ttl: i32,
    pub peer_limit: usize,
    pub ping_interval_ms: u64,
    pub peer_timeout_ms: u64,
    pub pull_interval_ms: u64,
    pub max_ihave_ids: usize,
    pub pow_difficulty: u32,
    pub seed: u64,
    pub bootstrap: Option<SocketAddr>,
}

impl NodeConfig {
    /// Sanity-check the configuration. Called once at construction; the
    /// result is never re-checked afterward since the config is immutable.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.fanout == 0 {
            return Err(NodeError::InvalidConfig("fanout must be at least 1".into()));
        }
        if self.peer_limit == 0 {
            return Err(NodeError::InvalidConfig("peer_limit must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("event sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Errors a single handler invocation can surface. None of these terminate
/// the receiver loop — they're absorbed and logged at the call site.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("transient decode failure: {0}")]
    TransientDecode(#[from] CodecError),
    #[error("unknown message kind: {0}")]
    UnknownKind(String),
    #[error("admission rejected for {0}")]
    AdmissionRejected(SocketAddr),
    #[error("view is full, dropping new peer {0}")]
    ViewFull(SocketAddr),
    #[error("send failed: {0}")]
    SendFailed(#[from] TransportError),
}

/// Everything the seen-set and gossip store need to be touched together
/// atomically — the reference's single `node->lock`.
struct NodeLockedState {
    seen: SeenSet,
    store: GossipStore,
}

/// Hook for external metrics collection. `Node` calls these at the points
/// where the corresponding counters in `node/src/metrics.rs` are defined.
/// Default implementations are no-ops so tests and the in-memory harness
/// don't need to supply one.
pub trait NodeObserver: Send + Sync {
    fn on_message_received(&self) {}
    fn on_message_relayed(&self) {}
    fn on_send(&self) {}
    fn on_pow_rejected(&self) {}
    fn on_view_rejected(&self) {}
}

pub struct Node {
    pub node_id: String,
    pub self_addr: SocketAddr,
    pub config: NodeConfig,
    pub view: MembershipView,
    pub transport: Arc<dyn Transport>,
    pub sink: Option<EventSink>,
    state: Mutex<NodeLockedState>,
    sent_counter: AtomicU64,
    observer: Option<Arc<dyn NodeObserver>>,
}

impl Node {
    pub fn new(
        node_id: String,
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        sink: Option<EventSink>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let self_addr = transport.local_addr();
        Ok(Node {
            node_id,
            self_addr,
            view: MembershipView::new(config.peer_limit, config.seed),
            config,
            transport,
            sink,
            state: Mutex::new(NodeLockedState {
                seen: SeenSet::new(),
                store: GossipStore::new(),
            }),
            sent_counter: AtomicU64::new(0),
            observer: None,
        })
    }

    /// Attach a metrics observer. Called once at construction time, before
    /// the node is wrapped in an `Arc` and handed to the duties.
    pub fn with_observer(mut self, observer: Arc<dyn NodeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn self_addr_string(&self) -> String {
        self.self_addr.to_string()
    }

    pub fn seen_count(&self) -> usize {
        self.state.lock().seen.len()
    }

    pub fn store_count(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn sent_messages(&self) -> u64 {
        self.sent_counter.load(Ordering::Relaxed)
    }

    // -- sending ------------------------------------------------------

    async fn send_envelope(&self, to: SocketAddr, envelope: &Envelope) -> Result<(), DispatchError> {
        let bytes = codec::encode(envelope)?;
        self.transport.send_to(to, &bytes).await?;
        self.sent_counter.fetch_add(1, Ordering::Relaxed);
        if let Some(observer) = &self.observer {
            observer.on_send();
        }
        if let Some(sink) = &self.sink {
            let _ = sink.record(now_ms(), SinkEvent::Send, &envelope.msg_type, &envelope.msg_id);
        }
        Ok(())
    }

    fn new_msg_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}_{}", self.node_id, now_ms())
    }

    // -- bootstrap ------------------------------------------------------

    /// Send `HELLO` then `GET_PEERS` to the configured bootstrap address,
    /// in that order, matching `node_bootstrap`.
    pub async fn bootstrap(&self) -> Result<(), DispatchError> {
        let Some(boot_addr) = self.config.bootstrap else {
            return Ok(());
        };
        self.view.touch_or_add(boot_addr);

        let pow = if self.config.pow_difficulty > 0 {
            let (nonce, digest_hex) = pow::mine(&self.node_id, self.config.pow_difficulty)
                .map_err(|e| DispatchError::UnknownKind(e.to_string()))?;
            Some(PowCredential {
                hash_alg: "sha256".to_string(),
                difficulty_k: self.config.pow_difficulty,
                nonce,
                digest_hex,
            })
        } else {
            None
        };

        let hello_payload = HelloPayload {
            capabilities: vec!["udp".to_string(), "json".to_string()],
            pow,
        };
        let hello = Envelope::new(
            format!("HELLO_{}", self.node_id),
            MsgType::Hello,
            self.node_id.clone(),
            self.self_addr_string(),
            now_ms(),
            1,
            serde_json::to_value(hello_payload).unwrap_or_default(),
        );
        self.send_envelope(boot_addr, &hello).await?;

        let get_peers = Envelope::new(
            self.new_msg_id("GET"),
            MsgType::GetPeers,
            self.node_id.clone(),
            self.self_addr_string(),
            now_ms(),
            1,
            serde_json::to_value(GetPeersPayload { max_peers: 20 }).unwrap_or_default(),
        );
        self.send_envelope(boot_addr, &get_peers).await?;
        Ok(())
    }

    // -- dispatch ---------------------------------------------------------

    /// Decode and route one datagram. Errors here are all handled by the
    /// caller (logged, never propagated as a fatal failure).
    pub async fn handle_datagram(&self, bytes: &[u8], sender: SocketAddr) -> Result<(), DispatchError> {
        let envelope = codec::decode(bytes)?;
        let kind = envelope
            .kind()
            .map_err(|e| DispatchError::UnknownKind(e.0.clone()))?;

        match kind {
            MsgType::Hello => self.handle_hello(&envelope, sender).await,
            MsgType::GetPeers => self.handle_get_peers(&envelope, sender).await,
            MsgType::PeersList => self.handle_peers_list(&envelope).await,
            MsgType::Gossip => self.handle_gossip(&envelope, sender).await,
            MsgType::Ping => self.handle_ping(&envelope, sender).await,
            MsgType::Pong => self.handle_pong(&envelope, sender).await,
            MsgType::IHave => self.handle_ihave(&envelope, sender).await,
            MsgType::IWant => self.handle_iwant(&envelope, sender).await,
        }
    }

    async fn handle_hello(&self, envelope: &Envelope, sender: SocketAddr) -> Result<(), DispatchError> {
        if self.config.pow_difficulty > 0 {
            let payload: HelloPayload = serde_json::from_value(envelope.payload.clone()).unwrap_or(HelloPayload {
                capabilities: vec![],
                pow: None,
            });
            let admitted = match &payload.pow {
                Some(cred) => pow::verify(&envelope.sender_id, cred.nonce, self.config.pow_difficulty),
                None => false,
            };
            if !admitted {
                warn!(peer = %sender, "rejecting HELLO: invalid or missing proof of work");
                if let Some(observer) = &self.observer {
                    observer.on_pow_rejected();
                }
                return Err(DispatchError::AdmissionRejected(sender));
            }
        }

        if self.view.touch_or_add(sender) == TouchResult::RejectedFull {
            debug!(peer = %sender, "membership view full, dropping HELLO sender");
            if let Some(observer) = &self.observer {
                observer.on_view_rejected();
            }
            return Err(DispatchError::ViewFull(sender));
        }
        self.handle_get_peers(envelope, sender).await
    }

    async fn handle_get_peers(&self, _envelope: &Envelope, sender: SocketAddr) -> Result<(), DispatchError> {
        let peers = self
            .view
            .snapshot()
            .into_iter()
            .map(|addr| PeerAddr { addr: addr.to_string() })
            .collect();
        let reply = Envelope::new(
            self.new_msg_id("PEERS"),
            MsgType::PeersList,
            self.node_id.clone(),
            self.self_addr_string(),
            now_ms(),
            1,
            serde_json::to_value(PeersListPayload { peers }).unwrap_or_default(),
        );
        self.send_envelope(sender, &reply).await
    }

    async fn handle_peers_list(&self, envelope: &Envelope) -> Result<(), DispatchError> {
        let Ok(payload) = serde_json::from_value::<PeersListPayload>(envelope.payload.clone()) else {
            return Ok(());
        };
        for peer in payload.peers {
            if let Ok(addr) = peer.addr.parse::<SocketAddr>() {
                self.view.touch_or_add(addr);
            }
        }
        Ok(())
    }

    async fn handle_gossip(&self, envelope: &Envelope, sender: SocketAddr) -> Result<(), DispatchError> {
        let is_new = {
            let mut state = self.state.lock();
            if state.seen.contains(&envelope.msg_id) {
                false
            } else {
                state.seen.insert(&envelope.msg_id);
                if let Ok(bytes) = codec::encode(envelope) {
                    state.store.put(&envelope.msg_id, bytes);
                }
                true
            }
        };

        if !is_new {
            trace!(msg_id = %envelope.msg_id, "duplicate GOSSIP dropped");
            return Ok(());
        }

        if let Some(observer) = &self.observer {
            observer.on_message_received();
        }
        if let Some(sink) = &self.sink {
            let _ = sink.record(now_ms(), SinkEvent::Receive, &envelope.msg_type, &envelope.msg_id);
        }

        self.relay(envelope, Some(sender)).await
    }

    /// Inject application gossip locally: mark it seen and stored as if it
    /// had just arrived, then relay with no sender to exclude. Mirrors
    /// the reference `main.c`'s `msg ` REPL command handling.
    pub async fn inject_gossip(&self, payload: serde_json::Value) -> Result<String, DispatchError> {
        let msg_id = self.new_msg_id("LOCAL");
        let envelope = Envelope::new(
            msg_id.clone(),
            MsgType::Gossip,
            self.node_id.clone(),
            self.self_addr_string(),
            now_ms(),
            self.config.ttl,
            payload,
        );
        {
            let mut state = self.state.lock();
            state.seen.insert(&envelope.msg_id);
            if let Ok(bytes) = codec::encode(&envelope) {
                state.store.put(&envelope.msg_id, bytes);
            }
        }
        if let Some(sink) = &self.sink {
            let _ = sink.record(now_ms(), SinkEvent::Send, &envelope.msg_type, &envelope.msg_id);
        }
        self.relay(&envelope, None).await?;
        Ok(msg_id)
    }

    /// Decrement ttl on a copy and fan it out to a fresh sample, excluding
    /// `exclude` (the immediate predecessor, if any). Must never be called
    /// with `state` or `view`'s lock held.
    async fn relay(&self, envelope: &Envelope, exclude: Option<SocketAddr>) -> Result<(), DispatchError> {
        if envelope.ttl <= 0 {
            return Ok(());
        }
        if let Some(observer) = &self.observer {
            observer.on_message_relayed();
        }
        let relay_copy = envelope.with_decremented_ttl();
        let targets = self.view.sample(self.config.fanout, exclude);
        for target in targets {
            self.send_envelope(target, &relay_copy).await?;
        }
        Ok(())
    }

    async fn handle_ping(&self, envelope: &Envelope, sender: SocketAddr) -> Result<(), DispatchError> {
        self.view.touch_or_add(sender);
        let payload: PingPayload = serde_json::from_value(envelope.payload.clone())
            .unwrap_or(PingPayload { ping_id: envelope.msg_id.clone() });
        let reply = Envelope::new(
            self.new_msg_id("PONG"),
            MsgType::Pong,
            self.node_id.clone(),
            self.self_addr_string(),
            now_ms(),
            1,
            serde_json::to_value(PongPayload { reply_to: payload.ping_id }).unwrap_or_default(),
        );
        self.send_envelope(sender, &reply).await
    }

    async fn handle_pong(&self, _envelope: &Envelope, sender: SocketAddr) -> Result<(), DispatchError> {
        self.view.touch_or_add(sender);
        Ok(())
    }

    async fn handle_ihave(&self, envelope: &Envelope, sender: SocketAddr) -> Result<(), DispatchError> {
        let Ok(payload) = serde_json::from_value::<IHavePayload>(envelope.payload.clone()) else {
            return Ok(());
        };
        let missing: Vec<String> = {
            let state = self.state.lock();
            payload
                .ids
                .into_iter()
                .filter(|id| !state.seen.contains(id))
                .collect()
        };
        if missing.is_empty() {
            return Ok(());
        }
        let reply = Envelope::new(
            self.new_msg_id("IWANT"),
            MsgType::IWant,
            self.node_id.clone(),
            self.self_addr_string(),
            now_ms(),
            1,
            serde_json::to_value(IWantPayload { ids: missing }).unwrap_or_default(),
        );
        self.send_envelope(sender, &reply).await
    }

    async fn handle_iwant(&self, envelope: &Envelope, sender: SocketAddr) -> Result<(), DispatchError> {
        let Ok(payload) = serde_json::from_value::<IWantPayload>(envelope.payload.clone()) else {
            return Ok(());
        };
        let stored: Vec<(String, Vec<u8>)> = {
            let state = self.state.lock();
            payload
                .ids
                .iter()
                .filter_map(|id| state.store.get(id).map(|bytes| (id.clone(), bytes)))
                .collect()
        };
        for (id, bytes) in stored {
            self.transport.send_to(sender, &bytes).await?;
            self.sent_counter.fetch_add(1, Ordering::Relaxed);
            if let Some(observer) = &self.observer {
                observer.on_send();
            }
            if let Some(sink) = &self.sink {
                let _ = sink.record(now_ms(), SinkEvent::Send, MsgType::Gossip.as_str(), &id);
            }
        }
        Ok(())
    }

    /// Broadcast an `IHAVE` naming the most recent `max_ihave_ids` held
    /// message ids to a fresh sample of peers. Driven by the pull
    /// reconciler duty.
    pub async fn announce_ihave(&self) -> Result<(), DispatchError> {
        let ids = {
            let state = self.state.lock();
            state.seen.recent(self.config.max_ihave_ids)
        };
        if ids.is_empty() {
            return Ok(());
        }
        let envelope = Envelope::new(
            self.new_msg_id("IHAVE"),
            MsgType::IHave,
            self.node_id.clone(),
            self.self_addr_string(),
            now_ms(),
            1,
            serde_json::to_value(IHavePayload {
                max_ids: self.config.max_ihave_ids as u32,
                ids,
            })
            .unwrap_or_default(),
        );
        for target in self.view.sample(self.config.fanout, None) {
            self.send_envelope(target, &envelope).await?;
        }
        Ok(())
    }

    /// Send `PING` to a fresh sample of peers, then expire anyone stale.
    /// Driven by the failure-detector duty.
    pub async fn run_failure_detector_round(&self) -> Result<(), DispatchError> {
        for target in self.view.sample(self.config.fanout, None) {
            let ping = Envelope::new(
                self.new_msg_id("PING"),
                MsgType::Ping,
                self.node_id.clone(),
                self.self_addr_string(),
                now_ms(),
                1,
                serde_json::to_value(PingPayload {
                    ping_id: self.new_msg_id("PING"),
                })
                .unwrap_or_default(),
            );
            self.send_envelope(target, &ping).await?;
        }
        self.view.expire(self.config.peer_timeout_ms);
        Ok(())
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::transport::fake::FakeNetwork;
    use std::sync::Arc;

    fn config(port: u16) -> NodeConfig {
        NodeConfig {
            port,
            fanout: 2,
            ttl: 3,
            peer_limit: 10,
            ping_interval_ms: 2000,
            peer_timeout_ms: 6000,
            pull_interval_ms: 0,
            max_ihave_ids: 32,
            pow_difficulty: 0,
            seed: 1,
            bootstrap: None,
        }
    }

    async fn make_node(net: &FakeNetwork, port: u16) -> Node {
        let addr: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let transport = net.register(addr);
        Node::new(format!("node-{port}"), config(port), transport, None).unwrap()
    }

    #[tokio::test]
    async fn duplicate_gossip_is_handled_once() {
        let net = FakeNetwork::new();
        let node = make_node(&net, 9001).await;
        let envelope = Envelope::new(
            "m1",
            MsgType::Gossip,
            "peer",
            "127.0.0.1:9002",
            0,
            3,
            serde_json::json!({"x": 1}),
        );
        let sender: SocketAddr = "127.0.0.1:9002".parse().unwrap();
        node.handle_gossip(&envelope, sender).await.unwrap();
        node.handle_gossip(&envelope, sender).await.unwrap();
        assert_eq!(node.seen_count(), 1);
    }

    #[tokio::test]
    async fn expired_ttl_gossip_does_not_relay() {
        let net = FakeNetwork::new();
        let node = make_node(&net, 9001).await;
        node.view.touch_or_add("127.0.0.1:9003".parse().unwrap());
        let envelope = Envelope::new("m1", MsgType::Gossip, "peer", "127.0.0.1:9002", 0, 0, serde_json::json!({}));
        let sender: SocketAddr = "127.0.0.1:9002".parse().unwrap();
        node.handle_gossip(&envelope, sender).await.unwrap();
        assert_eq!(node.sent_messages(), 0);
    }

    #[tokio::test]
    async fn inject_gossip_marks_seen_and_relays_with_no_exclude() {
        let net = FakeNetwork::new();
        let node = make_node(&net, 9001).await;
        node.view.touch_or_add("127.0.0.1:9002".parse().unwrap());
        let id = node.inject_gossip(serde_json::json!({"hello": true})).await.unwrap();
        assert!(node.seen_count() >= 1);
        assert_eq!(node.sent_messages(), 1);
        let _ = id;
    }
}

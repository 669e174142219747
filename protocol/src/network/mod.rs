//! # Network Module
//!
//! The gossip dissemination engine. Every wire-visible behavior of a node
//! lives under this module.
//!
//! ```text
//! messages.rs         — Envelope & per-kind payload schemas
//! codec.rs            — Wire (de)serialization
//! membership.rs       — Bounded random peer view
//! seen.rs             — Bounded dedup cache
//! store.rs            — Bounded store for IWANT replies
//! pow.rs               — Join-time proof-of-work admission gate
//! transport.rs        — UDP socket abstraction (+ in-memory fake for tests)
//! sink.rs              — Append-only protocol event log
//! node.rs              — Node state + message handlers
//! receiver.rs          — Receive-and-dispatch duty
//! failure_detector.rs  — Periodic PING/PONG + expiry duty
//! pull_reconciler.rs   — Periodic IHAVE/IWANT duty
//! ```
//!
//! ## Design Decisions
//!
//! - Two locks: the membership view's own `RwLock`, and a single `Mutex`
//!   covering the seen-set, gossip store, and send counter together (the
//!   reference's `node->lock`). When both are needed, the node lock is
//!   acquired first.
//! - `relay` never runs with either lock held — handlers release before
//!   calling it.
//! - The three duties are independent `tokio` tasks sharing one
//!   `watch::Receiver<bool>` shutdown signal.

pub mod codec;
pub mod failure_detector;
pub mod membership;
pub mod messages;
pub mod node;
pub mod pow;
pub mod pull_reconciler;
pub mod receiver;
pub mod seen;
pub mod sink;
pub mod store;
pub mod transport;

pub use codec::{decode, encode, CodecError};
pub use membership::{MembershipView, PeerRecord, TouchResult};
pub use messages::{Envelope, MsgType, UnknownKindError};
pub use node::{DispatchError, Node, NodeConfig, NodeError, NodeObserver};
pub use pow::PowError;
pub use seen::SeenSet;
pub use sink::{EventSink, SinkError, SinkEvent};
pub use store::GossipStore;
pub use transport::{Transport, TransportError, UdpTransport};

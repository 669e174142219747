//! # Protocol Configuration & Constants
//!
//! Every magic number in the gossip engine lives here. If you're hardcoding
//! a constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! These values define the shape of the overlay: how big a view can grow,
//! how long a message keeps hopping, how paranoid the join gate is. Changing
//! them mid-deployment is safe (nodes don't negotiate these), but changing
//! them *inconsistently* across a running network will just make dedup and
//! fan-out behave weirdly — so pick sane defaults and leave them alone.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Identity
// ---------------------------------------------------------------------------

/// Wire protocol version carried in every envelope. Bump on breaking
/// changes to the envelope shape, not on behavioral tuning.
pub const WIRE_PROTOCOL_VERSION: u32 = 1;

/// Protocol fingerprint, mostly useful in logs to confirm which build a
/// node is running.
pub const PROTOCOL_FINGERPRINT: &str = "GOSSIP-NODE-1";

// ---------------------------------------------------------------------------
// Wire Format Limits
// ---------------------------------------------------------------------------

/// Maximum length of a `msg_id` string. Matches the reference
/// implementation's fixed-width `ID_LEN` field — long enough for a UUID
/// plus a readable prefix, short enough to keep the envelope tiny.
pub const ID_LEN: usize = 127;

/// Maximum length of a `node_id` string.
pub const NODE_ID_LEN: usize = 63;

/// Maximum length of an `addr` string (`ip:port`).
pub const ADDR_STR_LEN: usize = 63;

/// Maximum length of a `msg_type` string.
pub const MSG_TYPE_LEN: usize = 31;

/// Maximum size in bytes of an encoded `payload` value. The reference
/// source carries two competing values for this across header variants
/// (1024 and 8192); the larger one is the one actually present in the
/// kept `message.h` and is treated as authoritative here.
pub const PAYLOAD_MAX_BYTES: usize = 8192;

/// Maximum size in bytes of a fully serialized envelope on the wire.
/// Must comfortably exceed `PAYLOAD_MAX_BYTES` plus the scalar fields'
/// worst-case JSON encoding.
pub const ENVELOPE_MAX_BYTES: usize = 10_240;

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// Hard ceiling on the size of any node's membership view, independent of
/// the configured `peer_limit` (which is clamped to this).
pub const MAX_PEERS: usize = 64;

/// Default peer-limit used by the CLI when the operator doesn't override it.
pub const DEFAULT_PEER_LIMIT: usize = 20;

// ---------------------------------------------------------------------------
// Dissemination
// ---------------------------------------------------------------------------

/// Default fan-out: number of peers a relay or pull round targets.
pub const DEFAULT_FANOUT: usize = 3;

/// Default time-to-live for freshly injected gossip.
pub const DEFAULT_TTL: i32 = 5;

/// Bound on the seen-set: how many recent message IDs are remembered for
/// deduplication before the oldest are evicted.
pub const MAX_SEEN: usize = 2000;

/// Bound on the gossip store: how many serialized envelopes are kept
/// around to answer `IWANT` requests.
pub const MAX_STORED: usize = 500;

/// Default cap on how many ids a single `IHAVE` advertises.
pub const DEFAULT_MAX_IHAVE_IDS: usize = 32;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Default interval between failure-detector `PING` rounds.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(2);

/// Default peer staleness timeout: a peer not heard from in this long is
/// evicted from the view on the next failure-detector sweep.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(6);

/// Default interval between pull-reconciliation `IHAVE` rounds. Zero
/// disables the pull reconciler entirely.
pub const DEFAULT_PULL_INTERVAL: Duration = Duration::from_secs(0);

/// How long the receiver blocks waiting for a datagram before re-checking
/// the shutdown signal. Bounds shutdown latency.
pub const RECEIVE_POLL_TIMEOUT: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Proof of Work
// ---------------------------------------------------------------------------

/// Default PoW difficulty (required leading zero hex nibbles). Zero
/// disables admission control entirely — every `HELLO` is accepted.
pub const DEFAULT_POW_DIFFICULTY: u32 = 0;

/// Safety cap on mining iterations before `mine` gives up and returns an
/// error instead of spinning forever on a pathological difficulty.
pub const MAX_POW_ITERATIONS: u64 = 50_000_000;

// ---------------------------------------------------------------------------
// Randomness
// ---------------------------------------------------------------------------

/// Default RNG seed for membership sampling, used when the operator
/// doesn't supply one. Fixed by default so behavior is reproducible in
/// tests and demos; override in production if true unpredictability of
/// sampling order matters to you.
pub const DEFAULT_SEED: u64 = 42;

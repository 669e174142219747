//! # Envelope & Payload Types
//!
//! The `Envelope` is the one thing every peer on the wire agrees on. Its
//! field order is fixed (see [`crate::network::codec`]) and every string
//! field has a hard length bound inherited from the reference
//! implementation's fixed-width C buffers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ADDR_STR_LEN, ID_LEN, MSG_TYPE_LEN, NODE_ID_LEN};

/// The eight message kinds this protocol dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    Hello,
    GetPeers,
    PeersList,
    Gossip,
    Ping,
    Pong,
    IHave,
    IWant,
}

impl MsgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgType::Hello => "HELLO",
            MsgType::GetPeers => "GET_PEERS",
            MsgType::PeersList => "PEERS_LIST",
            MsgType::Gossip => "GOSSIP",
            MsgType::Ping => "PING",
            MsgType::Pong => "PONG",
            MsgType::IHave => "IHAVE",
            MsgType::IWant => "IWANT",
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MsgType {
    type Err = UnknownKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "HELLO" => MsgType::Hello,
            "GET_PEERS" => MsgType::GetPeers,
            "PEERS_LIST" => MsgType::PeersList,
            "GOSSIP" => MsgType::Gossip,
            "PING" => MsgType::Ping,
            "PONG" => MsgType::Pong,
            "IHAVE" => MsgType::IHave,
            "IWANT" => MsgType::IWant,
            other => return Err(UnknownKindError(other.to_string())),
        })
    }
}

/// Returned by `MsgType::from_str` when the wire carries a kind this node
/// doesn't recognize. The dispatcher treats this as a silent drop.
#[derive(Debug, Clone)]
pub struct UnknownKindError(pub String);

impl fmt::Display for UnknownKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKindError {}

/// The on-wire envelope. Field order here is cosmetic (serde_json doesn't
/// care), but the codec's *encoder* writes them in this exact order to stay
/// byte-compatible with the reference implementation's hand-rolled
/// `snprintf` format string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub version: u32,
    pub msg_id: String,
    pub msg_type: String,
    pub sender_id: String,
    pub sender_addr: String,
    pub timestamp_ms: u64,
    pub ttl: i32,
    #[serde(default = "default_payload")]
    pub payload: serde_json::Value,
}

fn default_payload() -> serde_json::Value {
    serde_json::Value::Null
}

impl Envelope {
    /// Build a new envelope, truncating any field that exceeds its
    /// fixed-width bound rather than rejecting it, matching the reference
    /// encoder's `snprintf`/`strcpy`-into-fixed-buffer semantics.
    pub fn new(
        msg_id: impl Into<String>,
        msg_type: MsgType,
        sender_id: impl Into<String>,
        sender_addr: impl Into<String>,
        timestamp_ms: u64,
        ttl: i32,
        payload: serde_json::Value,
    ) -> Self {
        Envelope {
            version: crate::config::WIRE_PROTOCOL_VERSION,
            msg_id: truncate(msg_id.into(), ID_LEN),
            msg_type: truncate(msg_type.as_str().to_string(), MSG_TYPE_LEN),
            sender_id: truncate(sender_id.into(), NODE_ID_LEN),
            sender_addr: truncate(sender_addr.into(), ADDR_STR_LEN),
            timestamp_ms,
            ttl,
            payload,
        }
    }

    /// Parse `msg_type` into the typed enum; unknown kinds bubble up so the
    /// dispatcher can drop them.
    pub fn kind(&self) -> Result<MsgType, UnknownKindError> {
        self.msg_type.parse()
    }

    /// A copy of this envelope with `ttl` decremented by one. Used by
    /// `relay` so the original (seen-set / gossip-store) copy keeps its
    /// original ttl.
    pub fn with_decremented_ttl(&self) -> Self {
        let mut copy = self.clone();
        copy.ttl -= 1;
        copy
    }
}

fn truncate(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        // Find a char boundary at or before max_len to avoid panicking on
        // multi-byte UTF-8 sequences.
        let mut cut = max_len;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
    }
    s
}

// ---------------------------------------------------------------------------
// Payload schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowCredential {
    pub hash_alg: String,
    pub difficulty_k: u32,
    pub nonce: u64,
    pub digest_hex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub pow: Option<PowCredential>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPeersPayload {
    pub max_peers: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAddr {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeersListPayload {
    pub peers: Vec<PeerAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingPayload {
    pub ping_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongPayload {
    pub reply_to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IHavePayload {
    pub ids: Vec<String>,
    pub max_ids: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IWantPayload {
    pub ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msg_type_round_trips_through_str() {
        for kind in [
            MsgType::Hello,
            MsgType::GetPeers,
            MsgType::PeersList,
            MsgType::Gossip,
            MsgType::Ping,
            MsgType::Pong,
            MsgType::IHave,
            MsgType::IWant,
        ] {
            let parsed: MsgType = kind.as_str().parse().unwrap();
            assert_eq!(parsed.as_str(), kind.as_str());
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("BOGUS".parse::<MsgType>().is_err());
    }

    #[test]
    fn long_fields_are_truncated_not_rejected() {
        let long_id = "x".repeat(ID_LEN + 50);
        let env = Envelope::new(long_id, MsgType::Gossip, "n1", "127.0.0.1:9001", 0, 1, serde_json::json!({}));
        assert_eq!(env.msg_id.len(), ID_LEN);
    }

    #[test]
    fn decrement_ttl_leaves_original_untouched() {
        let env = Envelope::new("m1", MsgType::Gossip, "n1", "127.0.0.1:9001", 0, 5, serde_json::json!({}));
        let copy = env.with_decremented_ttl();
        assert_eq!(env.ttl, 5);
        assert_eq!(copy.ttl, 4);
    }
}

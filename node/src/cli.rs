//! # CLI Interface
//!
//! Defines the command-line argument structure for `gossip-node` using
//! `clap` derive. The surface is flat (no subcommands): one run of the
//! binary is one node, configured entirely by flags and environment
//! variables prefixed `GOSSIP_NODE_`.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// A peer-to-peer gossip dissemination node.
#[derive(Parser, Debug)]
#[command(name = "gossip-node", about = "Gossip dissemination node", version)]
pub struct GossipNodeCli {
    /// UDP port this node listens on.
    #[arg(long, short = 'p', env = "GOSSIP_NODE_PORT")]
    pub port: u16,

    /// Number of peers targeted by each push relay or pull round.
    #[arg(long, short = 'f', env = "GOSSIP_NODE_FANOUT", default_value_t = 3)]
    pub fanout: usize,

    /// Time-to-live applied to locally injected gossip messages.
    #[arg(long, short = 't', env = "GOSSIP_NODE_TTL", default_value_t = 5)]
    pub ttl: i32,

    /// Address of an existing node to bootstrap membership from.
    #[arg(long, short = 'b', env = "GOSSIP_NODE_BOOTSTRAP")]
    pub bootstrap: Option<SocketAddr>,

    /// Maximum number of peers this node will hold in its membership view.
    #[arg(long, env = "GOSSIP_NODE_PEER_LIMIT", default_value_t = 20)]
    pub peer_limit: usize,

    /// Interval, in seconds, between failure-detector PING rounds.
    #[arg(long, env = "GOSSIP_NODE_PING_INTERVAL_S", default_value_t = 2)]
    pub ping_interval_s: u64,

    /// Seconds of silence before a peer is evicted from the membership view.
    #[arg(long, env = "GOSSIP_NODE_PEER_TIMEOUT_S", default_value_t = 6)]
    pub peer_timeout_s: u64,

    /// Seed for the membership view's sampling RNG, for reproducible runs.
    #[arg(long, env = "GOSSIP_NODE_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Interval, in seconds, between pull-reconciliation IHAVE rounds.
    /// Zero disables the pull reconciler.
    #[arg(long, env = "GOSSIP_NODE_PULL_INTERVAL_S", default_value_t = 0)]
    pub pull_interval_s: u64,

    /// Maximum number of message ids advertised per IHAVE.
    #[arg(long, env = "GOSSIP_NODE_MAX_IHAVE_IDS", default_value_t = 32)]
    pub max_ihave_ids: usize,

    /// Required leading zero hex nibbles for join-time proof-of-work.
    /// Zero disables admission control.
    #[arg(long, env = "GOSSIP_NODE_POW_DIFFICULTY", default_value_t = 0)]
    pub pow_difficulty: u32,

    /// A one-shot JSON payload to inject as a GOSSIP message at startup,
    /// after bootstrap completes.
    #[arg(long, env = "GOSSIP_NODE_MESSAGE")]
    pub message: Option<String>,

    /// Path to the append-only protocol event log. Defaults to
    /// `node_<port>.log` in the current directory.
    #[arg(long, env = "GOSSIP_NODE_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level filter (passed through to `RUST_LOG` if that is unset).
    #[arg(long, env = "GOSSIP_NODE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Structured log format: "pretty" or "json".
    #[arg(long, env = "GOSSIP_NODE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Bind address for the Prometheus `/metrics` endpoint.
    #[arg(long, env = "GOSSIP_NODE_METRICS_ADDR", default_value = "127.0.0.1:9742")]
    pub metrics_addr: SocketAddr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        GossipNodeCli::command().debug_assert();
    }

    #[test]
    fn parses_minimal_required_args() {
        let cli = GossipNodeCli::parse_from(["gossip-node", "--port", "9001"]);
        assert_eq!(cli.port, 9001);
        assert_eq!(cli.fanout, 3);
        assert_eq!(cli.ttl, 5);
        assert!(cli.bootstrap.is_none());
    }
}

// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Gossip Node
//!
//! Entry point for the `gossip-node` binary: parses CLI arguments,
//! initializes logging, binds the UDP transport, starts the three
//! background duties (receiver, failure detector, pull reconciler), and
//! serves the Prometheus `/metrics` endpoint until shutdown.

mod cli;
mod logging;
mod metrics;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;

use gossip_protocol::network::node::{Node, NodeConfig};
use gossip_protocol::network::transport::UdpTransport;
use gossip_protocol::network::{failure_detector, pull_reconciler, receiver, EventSink};

use cli::GossipNodeCli;
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = GossipNodeCli::parse();
    run_node(cli).await
}

/// Startup sequence:
/// 1. Parse CLI args (already done by `main`)
/// 2. Initialize logging
/// 3. Bind the UDP transport
/// 4. Generate this node's identity
/// 5. Open the append-only event log
/// 6. Build node config + construct the `Node`
/// 7. Bootstrap against a configured peer, if any
/// 8. Set up the shutdown signal
/// 9. Spawn the receiver, failure-detector, and pull-reconciler duties
/// 10. Start the metrics server
/// 11. Inject a one-shot local message, if configured
/// 12. Print the startup banner
/// 13. Await shutdown
/// 14. Join duties and exit
async fn run_node(cli: GossipNodeCli) -> Result<()> {
    let log_filter = format!(
        "gossip_node={level},gossip_protocol={level}",
        level = cli.log_level
    );
    let log_format = LogFormat::from_str_lossy(&cli.log_format);
    logging::init_logging(&log_filter, log_format);

    tracing::info!(
        port = cli.port,
        fanout = cli.fanout,
        ttl = cli.ttl,
        bootstrap = ?cli.bootstrap,
        pow_difficulty = cli.pow_difficulty,
        "starting gossip-node"
    );

    let bind_addr: SocketAddr = format!("127.0.0.1:{}", cli.port)
        .parse()
        .context("failed to construct bind address")?;
    let transport = Arc::new(
        UdpTransport::bind(bind_addr)
            .await
            .context("failed to bind UDP socket")?,
    );

    let node_id = uuid::Uuid::new_v4().to_string();

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| EventSink::default_path_for_port(cli.port));
    let sink = EventSink::open(&log_path).context("failed to open event log")?;

    let config = NodeConfig {
        port: cli.port,
        fanout: cli.fanout,
        ttl: cli.ttl,
        peer_limit: cli.peer_limit,
        ping_interval_ms: cli.ping_interval_s * 1000,
        peer_timeout_ms: cli.peer_timeout_s * 1000,
        pull_interval_ms: cli.pull_interval_s * 1000,
        max_ihave_ids: cli.max_ihave_ids,
        pow_difficulty: cli.pow_difficulty,
        seed: cli.seed,
        bootstrap: cli.bootstrap,
    };

    let metrics = Arc::new(NodeMetrics::new());

    let node = Arc::new(
        Node::new(node_id.clone(), config, transport, Some(sink))
            .context("failed to construct node")?
            .with_observer(metrics.clone()),
    );

    if node.config.bootstrap.is_some() {
        if let Err(err) = node.bootstrap().await {
            tracing::warn!(error = %err, "bootstrap handshake failed");
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let receiver_handle = tokio::spawn(receiver::run(node.clone(), shutdown_rx.clone()));
    let failure_detector_handle =
        tokio::spawn(failure_detector::run(node.clone(), shutdown_rx.clone()));
    let pull_reconciler_handle =
        tokio::spawn(pull_reconciler::run(node.clone(), shutdown_rx.clone()));

    let metrics_server = tokio::spawn(serve_metrics(cli.metrics_addr, metrics, node.clone()));

    if let Some(message) = &cli.message {
        let payload: serde_json::Value =
            serde_json::from_str(message).unwrap_or_else(|_| serde_json::json!({"data": message}));
        match node.inject_gossip(payload).await {
            Ok(msg_id) => tracing::info!(msg_id, "injected local gossip message"),
            Err(err) => tracing::warn!(error = %err, "failed to inject local message"),
        }
    }

    print_startup_banner(&node_id, cli.port, cli.fanout, cli.ttl, &log_path.display().to_string());

    shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping duties");
    let _ = shutdown_tx.send(true);

    let _ = tokio::join!(receiver_handle, failure_detector_handle, pull_reconciler_handle);
    metrics_server.abort();

    tracing::info!("gossip-node stopped cleanly");
    Ok(())
}

async fn serve_metrics(addr: SocketAddr, metrics: Arc<NodeMetrics>, node: Arc<Node>) {
    let app = metrics::router(metrics, node);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!(%addr, "metrics server listening");
            if let Err(err) = axum::serve(listener, app).await {
                tracing::warn!(error = %err, "metrics server exited with an error");
            }
        }
        Err(err) => {
            tracing::warn!(%addr, error = %err, "failed to bind metrics server");
        }
    }
}

fn print_startup_banner(node_id: &str, port: u16, fanout: usize, ttl: i32, log_path: &str) {
    let node_id_short = if node_id.len() > 20 {
        format!("{}...", &node_id[..20])
    } else {
        node_id.to_string()
    };

    let lines = [
        format!("  Node ID:   {}", node_id_short),
        format!("  Listening: 127.0.0.1:{}", port),
        format!("  Fanout:    {}", fanout),
        format!("  TTL:       {}", ttl),
        format!("  Event log: {}", log_path),
    ];

    let title = format!("  Gossip Node v{}", env!("CARGO_PKG_VERSION"));
    let width = lines
        .iter()
        .chain(std::iter::once(&title))
        .map(|l| l.len())
        .max()
        .unwrap_or(40)
        + 2;

    println!("\u{250C}{}\u{2510}", "\u{2500}".repeat(width));
    println!("\u{2502}{:<width$}\u{2502}", title, width = width);
    println!("\u{251C}{}\u{2524}", "\u{2500}".repeat(width));
    for line in lines {
        println!("\u{2502}{:<width$}\u{2502}", line, width = width);
    }
    println!("\u{2514}{}\u{2518}", "\u{2500}".repeat(width));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

//! # Pull Reconciler Duty
//!
//! Periodically broadcasts `IHAVE` so peers can request anything push
//! flooding failed to deliver to them. Disabled entirely when
//! `pull_interval_ms` is zero, matching the spec's "zero disables" rule.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::network::node::Node;

pub async fn run(node: Arc<Node>, mut shutdown: watch::Receiver<bool>) {
    if node.config.pull_interval_ms == 0 {
        debug!("pull reconciler disabled (pull_interval_ms = 0)");
        return;
    }

    let interval = Duration::from_millis(node.config.pull_interval_ms);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = node.announce_ihave().await {
                    warn!(error = %err, "pull reconciler round encountered an error");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("pull reconciler duty stopped");
}

//! # Failure Detector Duty
//!
//! Periodically pings a sample of peers and sweeps the membership view for
//! peers that have gone stale. Wakes on a fixed interval and checks the
//! shutdown signal at each wake, the same pattern the teacher's
//! `ConsensusLoop::run` uses for its per-round sleep.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::network::node::Node;

pub async fn run(node: Arc<Node>, mut shutdown: watch::Receiver<bool>) {
    let interval = Duration::from_millis(node.config.ping_interval_ms.max(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = node.run_failure_detector_round().await {
                    warn!(error = %err, "failure detector round encountered an error");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("failure detector duty stopped");
}

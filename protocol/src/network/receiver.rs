//! # Receiver Duty
//!
//! The datagram dispatch loop. Polls the transport with a bounded timeout
//! so it can interleave checking the shutdown signal, mirroring the
//! reference's `while (node->running) { recvfrom(...); ... }` but without
//! blocking indefinitely.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::config::RECEIVE_POLL_TIMEOUT;
use crate::network::node::{DispatchError, Node};

pub async fn run(node: Arc<Node>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            received = node.transport.recv_timeout(RECEIVE_POLL_TIMEOUT) => {
                match received {
                    Ok(Some((bytes, from))) => {
                        if let Err(err) = node.handle_datagram(&bytes, from).await {
                            log_dispatch_error(&err);
                        }
                    }
                    Ok(None) => {} // timed out, loop back to re-check shutdown
                    Err(err) => warn!(error = %err, "transport receive error"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("receiver duty stopped");
}

fn log_dispatch_error(err: &DispatchError) {
    match err {
        DispatchError::TransientDecode(e) => trace!(error = %e, "dropping malformed datagram"),
        DispatchError::UnknownKind(kind) => trace!(kind, "dropping datagram with unknown message kind"),
        DispatchError::AdmissionRejected(peer) => warn!(%peer, "admission rejected"),
        DispatchError::ViewFull(peer) => debug!(%peer, "membership view full"),
        DispatchError::SendFailed(e) => warn!(error = %e, "send failed while handling datagram"),
    }
}

//! # Transport
//!
//! Abstracts the datagram socket so the dispatcher and duties can be
//! exercised against an in-memory fake without binding real ports. The
//! production implementation wraps `tokio::net::UdpSocket`.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("bind failed on {0}: {1}")]
    Bind(SocketAddr, std::io::Error),
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_to(&self, addr: SocketAddr, bytes: &[u8]) -> Result<(), TransportError>;

    /// Receive a single datagram, waiting at most `timeout` before
    /// returning `Ok(None)`. Used by the receiver duty so it can
    /// periodically re-check the shutdown signal.
    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError>;

    fn local_addr(&self) -> SocketAddr;
}

pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError::Bind(addr, e))?;
        let local_addr = socket.local_addr().map_err(|e| TransportError::Bind(addr, e))?;
        Ok(UdpTransport { socket, local_addr })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&self, addr: SocketAddr, bytes: &[u8]) -> Result<(), TransportError> {
        self.socket
            .send_to(bytes, addr)
            .await
            .map_err(TransportError::Send)?;
        Ok(())
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError> {
        let mut buf = vec![0u8; crate::config::ENVELOPE_MAX_BYTES];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await {
            Ok(Ok((n, from))) => {
                buf.truncate(n);
                Ok(Some((buf, from)))
            }
            Ok(Err(e)) => Err(TransportError::Receive(e)),
            Err(_elapsed) => Ok(None),
        }
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// In-memory harness, also reachable from outside this crate (integration
/// tests link the library without the `test` cfg) behind the `testing`
/// feature.
#[cfg(any(test, feature = "testing"))]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use tokio::sync::Mutex as AsyncMutex;

    /// An in-memory transport for unit tests: `send_to` routes the
    /// datagram into the target's inbox when both ends share a
    /// [`FakeNetwork`]; `recv_timeout` pops from its own inbox.
    pub struct FakeTransport {
        pub local_addr: SocketAddr,
        pub network: FakeNetwork,
        inbox: AsyncMutex<VecDeque<(Vec<u8>, SocketAddr)>>,
    }

    #[derive(Clone)]
    pub struct FakeNetwork {
        nodes: std::sync::Arc<dashmap::DashMap<SocketAddr, std::sync::Arc<FakeTransport>>>,
    }

    impl FakeNetwork {
        pub fn new() -> Self {
            FakeNetwork {
                nodes: std::sync::Arc::new(dashmap::DashMap::new()),
            }
        }

        pub fn register(&self, addr: SocketAddr) -> std::sync::Arc<FakeTransport> {
            let transport = std::sync::Arc::new(FakeTransport {
                local_addr: addr,
                network: self.clone(),
                inbox: AsyncMutex::new(VecDeque::new()),
            });
            self.nodes.insert(addr, transport.clone());
            transport
        }

        async fn deliver(&self, to: SocketAddr, bytes: Vec<u8>, from: SocketAddr) -> Result<(), TransportError> {
            if let Some(target) = self.nodes.get(&to) {
                target.inbox.lock().await.push_back((bytes, from));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send_to(&self, addr: SocketAddr, bytes: &[u8]) -> Result<(), TransportError> {
            self.network.deliver(addr, bytes.to_vec(), self.local_addr).await
        }

        async fn recv_timeout(&self, timeout: Duration) -> Result<Option<(Vec<u8>, SocketAddr)>, TransportError> {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                if let Some(item) = self.inbox.lock().await.pop_front() {
                    return Ok(Some(item));
                }
                if tokio::time::Instant::now() >= deadline {
                    return Ok(None);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        fn local_addr(&self) -> SocketAddr {
            self.local_addr
        }
    }
}

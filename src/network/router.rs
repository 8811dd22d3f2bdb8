// src/network/router.rs

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{lookup_host, UdpSocket};

/// One UDP association with one bootstrap router.
///
/// The socket is connected, so sends need no destination and receives only
/// see this router. Clones share the socket; the receive loop owns the read
/// side by convention.
#[derive(Clone)]
pub struct RouterLink {
    address: String,
    remote: SocketAddr,
    socket: Arc<UdpSocket>,
    retired: Arc<AtomicBool>,
}

impl RouterLink {
    /// Resolve a router address (IPv4 only, the wire dialect is v4) and open
    /// a connected UDP socket to it.
    pub async fn connect(address: &str) -> io::Result<RouterLink> {
        let remote = lookup_host(address)
            .await?
            .find(|a| a.is_ipv4())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no IPv4 address for router {}", address),
                )
            })?;
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(remote).await?;
        Ok(RouterLink {
            address: address.to_string(),
            remote,
            socket: Arc::new(socket),
            retired: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn send_frame(&self, frame: &[u8]) -> io::Result<()> {
        self.socket.send(frame).await?;
        Ok(())
    }

    pub async fn recv_frame(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf).await
    }

    /// Mark the link for removal; its receive loop exits on the next
    /// iteration.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// The configured router address this link was opened against.
    pub fn address(&self) -> &str {
        &self.address
    }
}

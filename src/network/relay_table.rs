// src/network/relay_table.rs

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A forwarder advertised by a router: the relay's own endpoint paired with
/// the identity of the peer it proxies for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    pub addr: SocketAddr,
    pub destination: String,
}

struct RelayTableInner {
    relays: Vec<Relay>,
    blacklist: Vec<SocketAddr>,
}

/// Cache of live relay offers plus the blacklist of endpoints observed
/// failing. Both live under one mutex: blacklisting must evict from the
/// cache and record the endpoint in a single critical section.
#[derive(Clone)]
pub struct RelayTable {
    inner: Arc<Mutex<RelayTableInner>>,
}

impl Default for RelayTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RelayTableInner {
                relays: Vec::new(),
                blacklist: Vec::new(),
            })),
        }
    }

    /// Accept a relay offer into the cache. Duplicate (endpoint, destination)
    /// pairs and blacklisted endpoints are not stored. Returns whether the
    /// offer was inserted.
    pub async fn insert(&self, relay: Relay) -> bool {
        let mut table = self.inner.lock().await;
        if table.blacklist.contains(&relay.addr) {
            return false;
        }
        if table
            .relays
            .iter()
            .any(|r| r.addr == relay.addr && r.destination == relay.destination)
        {
            return false;
        }
        table.relays.push(relay);
        true
    }

    /// Evict every cached relay at this endpoint and record the endpoint as
    /// dead. Re-blacklisting is a no-op.
    pub async fn blacklist(&self, addr: SocketAddr) {
        let mut table = self.inner.lock().await;
        table.relays.retain(|r| r.addr != addr);
        if !table.blacklist.contains(&addr) {
            table.blacklist.push(addr);
        }
    }

    pub async fn is_blacklisted(&self, addr: &SocketAddr) -> bool {
        self.inner.lock().await.blacklist.contains(addr)
    }

    pub async fn clear_blacklist(&self) {
        self.inner.lock().await.blacklist.clear();
    }

    pub async fn relays(&self) -> Vec<Relay> {
        self.inner.lock().await.relays.clone()
    }

    pub async fn blacklisted(&self) -> Vec<SocketAddr> {
        self.inner.lock().await.blacklist.clone()
    }
}

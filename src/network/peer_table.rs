// src/network/peer_table.rs
// In-memory table of overlay members, reconciled against the authoritative
// lists the routers return.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One overlay member: its session identity plus every transport endpoint
/// learned for it so far (empty until a NODE reply resolves it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub id: String,
    pub endpoints: Vec<SocketAddr>,
}

impl PeerEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            endpoints: Vec::new(),
        }
    }
}

struct PeerTableInner {
    peers: Vec<PeerEntry>,
    // Every identity any router has ever mentioned, first-seen order.
    last_catch: Vec<String>,
}

#[derive(Clone)]
pub struct PeerTable {
    inner: Arc<Mutex<PeerTableInner>>,
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PeerTableInner {
                peers: Vec::new(),
                last_catch: Vec::new(),
            })),
        }
    }

    /// Reconcile against an authoritative identity list: unknown identities
    /// are inserted with no endpoints, entries the list omits are removed.
    /// Two-pass (diff first, then apply) so the result is independent of
    /// iteration order. Returns a snapshot of the resulting table.
    pub async fn reconcile(&self, ids: &[String]) -> Vec<PeerEntry> {
        let mut table = self.inner.lock().await;
        let additions: Vec<&String> = ids
            .iter()
            .filter(|id| !table.peers.iter().any(|p| &p.id == *id))
            .collect();
        for id in additions {
            table.peers.push(PeerEntry::new(id.clone()));
        }
        table.peers.retain(|p| ids.iter().any(|id| id == &p.id));
        for id in ids {
            if id.is_empty() {
                continue;
            }
            if !table.last_catch.iter().any(|seen| seen == id) {
                table.last_catch.push(id.clone());
            }
        }
        table.peers.clone()
    }

    /// An empty peer list from the router drops everything we knew.
    pub async fn clear(&self) {
        self.inner.lock().await.peers.clear();
    }

    /// Replace the endpoint list of a known identity. Returns false when the
    /// identity is not in the table (the update is dropped).
    pub async fn set_endpoints(&self, id: &str, endpoints: Vec<SocketAddr>) -> bool {
        let mut table = self.inner.lock().await;
        match table.peers.iter_mut().find(|p| p.id == id) {
            Some(entry) => {
                entry.endpoints = endpoints;
                true
            }
            None => false,
        }
    }

    pub async fn snapshot(&self) -> Vec<PeerEntry> {
        self.inner.lock().await.peers.clone()
    }

    pub async fn last_catch(&self) -> Vec<String> {
        self.inner.lock().await.last_catch.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.peers.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.peers.is_empty()
    }
}

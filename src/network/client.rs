// src/network/client.rs

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};

use crate::config::{Config, OperatingMode};
use crate::constants::{
    DATAGRAM_BUF_LEN, HANDSHAKE_BACKOFF, IDENTITY_WAIT, PEER_REFRESH_INTERVAL,
    PROTOCOL_VERSION, READ_FAILURE_LIMIT, REGISTER_POLL_INTERVAL, SESSION_ID_LEN, UNASSIGNED_ID,
};
use crate::events::model::LogLevel;
use crate::network::error::{server_error_text, StartError};
use crate::network::events::emit_network_event;
use crate::network::message::{Command, Message};
use crate::network::peer_table::{PeerEntry, PeerTable};
use crate::network::relay_table::{Relay, RelayTable};
use crate::network::router::RouterLink;

/// Lifecycle of the rendezvous session with the routers.
///
/// `Connecting` after every fresh socket, `Operating` once a router has
/// assigned an identity, `Reconnecting` after the identity was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Reconnecting,
    Operating,
}

/// Overlay address leased through the routers' DHCP dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayAddress {
    pub ip: IpAddr,
    pub prefix: u8,
}

struct ClientInner {
    network_id: String,
    port: u16,
    advertise_ips: Vec<IpAddr>,
    mode: OperatingMode,
    links: tokio::sync::Mutex<Vec<RouterLink>>,
    failed_routers: tokio::sync::Mutex<Vec<String>>,
    state: parking_lot::Mutex<ClientState>,
    // Completed by the CONN handler; start() and relay registration await it.
    identity: watch::Sender<String>,
    peers: PeerTable,
    relays: RelayTable,
    assigned: parking_lot::Mutex<Option<OverlayAddress>>,
    last_ping: parking_lot::Mutex<Instant>,
    shutdown: AtomicBool,
    peer_tx: mpsc::Sender<Vec<PeerEntry>>,
    relay_tx: mpsc::Sender<Relay>,
    remove_peer_tx: mpsc::Sender<String>,
}

/// Client half of the rendezvous control plane: joins an overlay network
/// through one or more bootstrap routers, keeps the peer and relay tables
/// reconciled, and hands discoveries to the enclosing engine over channels.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct DiscoveryClient {
    inner: Arc<ClientInner>,
}

impl DiscoveryClient {
    /// Connect and handshake every configured router, then wait briefly for
    /// an identity assignment. Fails only when no router accepted the
    /// handshake; an unassigned identity is not an error (operations may be
    /// retried once a later CONN reply lands).
    pub async fn start(
        config: Config,
        peer_tx: mpsc::Sender<Vec<PeerEntry>>,
        relay_tx: mpsc::Sender<Relay>,
        remove_peer_tx: mpsc::Sender<String>,
    ) -> Result<DiscoveryClient, StartError> {
        let (identity, _) = watch::channel(String::new());
        let client = DiscoveryClient {
            inner: Arc::new(ClientInner {
                network_id: config.network_id.clone(),
                port: config.port,
                advertise_ips: config.advertise_ips(),
                mode: config.mode(),
                links: tokio::sync::Mutex::new(Vec::new()),
                failed_routers: tokio::sync::Mutex::new(Vec::new()),
                state: parking_lot::Mutex::new(ClientState::Connecting),
                identity,
                peers: PeerTable::new(),
                relays: RelayTable::new(),
                assigned: parking_lot::Mutex::new(None),
                last_ping: parking_lot::Mutex::new(Instant::now()),
                shutdown: AtomicBool::new(false),
                peer_tx,
                relay_tx,
                remove_peer_tx,
            }),
        };

        let mut connected = 0usize;
        for router in config.router_list() {
            match client.connect_and_handshake(&router).await {
                Ok(link) => {
                    emit_network_event(
                        "client",
                        LogLevel::Info,
                        "router_connected",
                        Some(link.remote().to_string()),
                        Some(format!("router={}", router)),
                    );
                    client.inner.links.lock().await.push(link.clone());
                    connected += 1;
                    client.spawn_receive_loop(link);
                }
                Err(e) => {
                    emit_network_event(
                        "client",
                        LogLevel::Error,
                        "router_handshake_failed",
                        None,
                        Some(format!("router={} error={}", router, e)),
                    );
                    client.inner.failed_routers.lock().await.push(router);
                }
            }
        }

        if connected == 0 {
            return Err(StartError::NoRouters);
        }

        // Identity usually arrives within the first round-trip; give it a
        // bounded window and return either way.
        let mut rx = client.inner.identity.subscribe();
        let _ = timeout(IDENTITY_WAIT, async {
            while rx.borrow_and_update().len() != SESSION_ID_LEN {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;

        *client.inner.last_ping.lock() = Instant::now();
        client.spawn_peer_refresh();
        Ok(client)
    }

    async fn connect_and_handshake(&self, router: &str) -> std::io::Result<RouterLink> {
        *self.inner.state.lock() = ClientState::Connecting;
        emit_network_event(
            "client",
            LogLevel::Info,
            "router_connecting",
            None,
            Some(format!("router={}", router)),
        );
        let link = RouterLink::connect(router).await?;
        self.send_handshake(&link).await?;
        Ok(link)
    }

    /// CONN request: id placeholder, protocol version in the query, the
    /// data port and advertised addresses pipe-joined in the arguments, the
    /// overlay identifier in the payload.
    async fn send_handshake(&self, link: &RouterLink) -> std::io::Result<()> {
        let mut arguments = self.inner.port.to_string();
        for ip in &self.inner.advertise_ips {
            arguments.push('|');
            arguments.push_str(&ip.to_string());
        }
        let msg = Message {
            arguments,
            command: Command::Connect.tag().to_string(),
            id: UNASSIGNED_ID.to_string(),
            payload: self.inner.network_id.clone(),
            query: PROTOCOL_VERSION.to_string(),
        };
        let frame = msg
            .encode()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return Ok(());
        }
        link.send_frame(&frame).await
    }

    fn spawn_receive_loop(&self, link: RouterLink) {
        let client = self.clone();
        tokio::spawn(async move {
            client.receive_loop(link).await;
        });
    }

    /// One cooperative task per router link: read a datagram, decode it,
    /// dispatch it. Runs until shutdown, remote retirement, or the read
    /// failure limit; removes its link from the live set on the way out.
    async fn receive_loop(&self, link: RouterLink) {
        emit_network_event(
            "router",
            LogLevel::Info,
            "receive_loop_started",
            Some(link.remote().to_string()),
            None,
        );
        let mut failures: u32 = 0;
        let mut buf = [0u8; DATAGRAM_BUF_LEN];
        loop {
            if self.inner.shutdown.load(Ordering::SeqCst) || link.is_retired() {
                break;
            }
            match link.recv_frame(&mut buf).await {
                Ok(len) => {
                    failures = 0;
                    match Message::decode(&buf[..len]) {
                        Ok(msg) => self.dispatch(msg, &link).await,
                        Err(e) => {
                            emit_network_event(
                                "router",
                                LogLevel::Error,
                                "frame_decode_failed",
                                Some(link.remote().to_string()),
                                Some(e.to_string()),
                            );
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    emit_network_event(
                        "router",
                        LogLevel::Debug,
                        "frame_read_failed",
                        Some(link.remote().to_string()),
                        Some(e.to_string()),
                    );
                }
            }
            if failures > READ_FAILURE_LIMIT {
                emit_network_event(
                    "router",
                    LogLevel::Error,
                    "read_failure_limit",
                    Some(link.remote().to_string()),
                    None,
                );
                break;
            }
        }
        let mut links = self.inner.links.lock().await;
        links.retain(|l| l.remote() != link.remote());
        emit_network_event(
            "router",
            LogLevel::Info,
            "receive_loop_stopped",
            Some(link.remote().to_string()),
            None,
        );
    }

    /// Route one decoded frame to its handler. The handler set depends on
    /// the operating role; anything else is logged and dropped.
    async fn dispatch(&self, msg: Message, link: &RouterLink) {
        let Some(command) = msg.command() else {
            emit_network_event(
                "router",
                LogLevel::Debug,
                "unsupported_command",
                Some(link.remote().to_string()),
                Some(format!("command={}", msg.command)),
            );
            return;
        };
        let mode = self.inner.mode;
        match command {
            Command::Connect => self.handle_conn(&msg, link).await,
            Command::Find => self.handle_find(&msg, link).await,
            Command::Ping => self.handle_ping(link).await,
            Command::Dhcp => self.handle_dhcp(&msg),
            Command::Unknown => self.handle_unknown(link).await,
            Command::Error => self.handle_error(&msg),
            Command::Node if mode == OperatingMode::Client => self.handle_node(&msg).await,
            Command::ControlPeer if mode == OperatingMode::Client => self.handle_cp(&msg).await,
            Command::Notify if mode == OperatingMode::Client => self.handle_notify(&msg).await,
            Command::Stop if mode == OperatingMode::Client => self.handle_stop(&msg, link).await,
            Command::RegisterControlPeer if mode == OperatingMode::ControlPeer => {
                self.handle_regcp(link)
            }
            other => {
                emit_network_event(
                    "router",
                    LogLevel::Debug,
                    "command_not_handled",
                    Some(link.remote().to_string()),
                    Some(format!("command={} mode={:?}", other.tag(), mode)),
                );
            }
        }
    }

    async fn handle_conn(&self, msg: &Message, link: &RouterLink) {
        {
            let state = *self.inner.state.lock();
            if state != ClientState::Connecting && state != ClientState::Reconnecting {
                return;
            }
        }
        if msg.id.is_empty() || msg.id == UNASSIGNED_ID {
            emit_network_event(
                "client",
                LogLevel::Error,
                "empty_identity_received",
                Some(link.remote().to_string()),
                None,
            );
            return;
        }
        if msg.id.len() != SESSION_ID_LEN {
            emit_network_event(
                "client",
                LogLevel::Error,
                "malformed_identity_received",
                Some(link.remote().to_string()),
                Some(format!("len={}", msg.id.len())),
            );
            return;
        }
        *self.inner.state.lock() = ClientState::Operating;
        self.inner.identity.send_replace(msg.id.clone());
        emit_network_event(
            "client",
            LogLevel::Info,
            "session_identity_assigned",
            Some(link.remote().to_string()),
            Some(format!("id={}", msg.id)),
        );
    }

    async fn handle_ping(&self, link: &RouterLink) {
        *self.inner.last_ping.lock() = Instant::now();
        if self.inner.shutdown.load(Ordering::SeqCst) {
            return;
        }
        let msg = Message::compose(Command::Ping, &self.identity(), "", "");
        match msg.encode() {
            Ok(frame) => {
                if let Err(e) = link.send_frame(&frame).await {
                    emit_network_event(
                        "client",
                        LogLevel::Error,
                        "ping_reply_failed",
                        Some(link.remote().to_string()),
                        Some(e.to_string()),
                    );
                }
            }
            Err(e) => {
                emit_network_event("client", LogLevel::Error, "encode_failed", None, Some(e.to_string()));
            }
        }
    }

    /// Authoritative peer list: reconcile the table against it and publish a
    /// snapshot. An empty list clears the table without publishing.
    async fn handle_find(&self, msg: &Message, link: &RouterLink) {
        if msg.arguments.is_empty() {
            self.inner.peers.clear().await;
            return;
        }
        let ids: Vec<String> = msg.arguments.split(',').map(str::to_string).collect();
        let snapshot = self.inner.peers.reconcile(&ids).await;
        emit_network_event(
            "client",
            LogLevel::Debug,
            "peer_list_received",
            Some(link.remote().to_string()),
            Some(format!("peers={}", msg.arguments)),
        );
        if self.inner.peer_tx.send(snapshot).await.is_err() {
            emit_network_event("client", LogLevel::Debug, "peer_channel_closed", None, None);
        }
    }

    /// Endpoint resolution reply for one identity; empty and unparsable
    /// tokens are skipped, unknown identities dropped.
    async fn handle_node(&self, msg: &Message) {
        let mut endpoints: Vec<SocketAddr> = Vec::new();
        for token in msg.arguments.split('|') {
            if token.is_empty() {
                continue;
            }
            match token.parse::<SocketAddr>() {
                Ok(addr) => endpoints.push(addr),
                Err(e) => {
                    emit_network_event(
                        "client",
                        LogLevel::Error,
                        "peer_endpoint_unresolvable",
                        None,
                        Some(format!("endpoint={} error={}", token, e)),
                    );
                }
            }
        }
        if !self.inner.peers.set_endpoints(&msg.id, endpoints).await {
            emit_network_event(
                "client",
                LogLevel::Debug,
                "endpoints_for_unknown_peer",
                None,
                Some(format!("id={}", msg.id)),
            );
        }
    }

    /// Relay offer. Always surfaced to the engine; cached only when the
    /// (endpoint, destination) pair is new and the endpoint is not
    /// blacklisted.
    async fn handle_cp(&self, msg: &Message) {
        if msg.query.is_empty() || msg.query == UNASSIGNED_ID {
            return;
        }
        let addr: SocketAddr = match msg.query.parse() {
            Ok(addr) => addr,
            Err(e) => {
                emit_network_event(
                    "client",
                    LogLevel::Error,
                    "relay_endpoint_invalid",
                    None,
                    Some(format!("endpoint={} error={}", msg.query, e)),
                );
                return;
            }
        };
        let relay = Relay {
            addr,
            destination: msg.arguments.clone(),
        };
        emit_network_event(
            "client",
            LogLevel::Info,
            "relay_offer_received",
            Some(addr.to_string()),
            Some(format!("destination={}", relay.destination)),
        );
        if self.inner.relay_tx.send(relay.clone()).await.is_err() {
            emit_network_event("client", LogLevel::Debug, "relay_channel_closed", None, None);
        }
        self.inner.relays.insert(relay).await;
    }

    /// A peer cannot reach us directly; ask for a relay on its behalf.
    async fn handle_notify(&self, msg: &Message) {
        self.request_control_peer(&msg.id, &[]).await;
    }

    /// STOP with an identity drops that peer via the engine; a bare STOP
    /// retires this link.
    async fn handle_stop(&self, msg: &Message, link: &RouterLink) {
        if !msg.arguments.is_empty() {
            emit_network_event(
                "client",
                LogLevel::Info,
                "peer_stop_requested",
                None,
                Some(format!("id={}", msg.arguments)),
            );
            if self.inner.remove_peer_tx.send(msg.arguments.clone()).await.is_err() {
                emit_network_event(
                    "client",
                    LogLevel::Debug,
                    "remove_peer_channel_closed",
                    None,
                    None,
                );
            }
        } else {
            link.retire();
        }
    }

    fn handle_dhcp(&self, msg: &Message) {
        if msg.arguments == "ok" {
            emit_network_event(
                "client",
                LogLevel::Info,
                "address_announcement_confirmed",
                None,
                None,
            );
            return;
        }
        let Some((ip, prefix)) = msg.arguments.split_once('/') else {
            emit_network_event(
                "client",
                LogLevel::Error,
                "address_lease_malformed",
                None,
                Some(format!("arguments={}", msg.arguments)),
            );
            return;
        };
        let ip: IpAddr = match ip.parse() {
            Ok(ip) => ip,
            Err(e) => {
                emit_network_event(
                    "client",
                    LogLevel::Error,
                    "address_lease_malformed",
                    None,
                    Some(format!("arguments={} error={}", msg.arguments, e)),
                );
                return;
            }
        };
        let max_prefix = if ip.is_ipv4() { 32 } else { 128 };
        let prefix: u8 = match prefix.parse() {
            Ok(p) if p <= max_prefix => p,
            _ => {
                emit_network_event(
                    "client",
                    LogLevel::Error,
                    "address_lease_malformed",
                    None,
                    Some(format!("arguments={}", msg.arguments)),
                );
                return;
            }
        };
        emit_network_event(
            "client",
            LogLevel::Info,
            "address_lease_received",
            None,
            Some(format!("address={}/{}", ip, prefix)),
        );
        *self.inner.assigned.lock() = Some(OverlayAddress { ip, prefix });
    }

    /// The router refused our identity: back off, move to Reconnecting and
    /// replay the handshake on the same socket.
    async fn handle_unknown(&self, link: &RouterLink) {
        emit_network_event(
            "client",
            LogLevel::Warn,
            "identity_refused",
            Some(link.remote().to_string()),
            None,
        );
        let state = *self.inner.state.lock();
        if state == ClientState::Connecting || state == ClientState::Reconnecting {
            sleep(HANDSHAKE_BACKOFF).await;
        }
        *self.inner.state.lock() = ClientState::Reconnecting;
        emit_network_event(
            "client",
            LogLevel::Info,
            "handshake_replay",
            Some(link.remote().to_string()),
            None,
        );
        if let Err(e) = self.send_handshake(link).await {
            emit_network_event(
                "client",
                LogLevel::Error,
                "handshake_replay_failed",
                Some(link.remote().to_string()),
                Some(e.to_string()),
            );
        }
    }

    fn handle_error(&self, msg: &Message) {
        match server_error_text(&msg.arguments) {
            Some(text) => {
                emit_network_event(
                    "client",
                    LogLevel::Error,
                    "router_error",
                    None,
                    Some(format!("code={} error={}", msg.arguments, text)),
                );
            }
            None => {
                emit_network_event(
                    "client",
                    LogLevel::Error,
                    "router_error_unknown",
                    None,
                    Some(format!("code={}", msg.arguments)),
                );
            }
        }
    }

    fn handle_regcp(&self, link: &RouterLink) {
        emit_network_event(
            "client",
            LogLevel::Info,
            "relay_registration_confirmed",
            Some(link.remote().to_string()),
            None,
        );
    }

    /// Serialize once and write to every live link. Write failures are
    /// logged and the link stays live; only read-side accounting retires it.
    async fn broadcast(&self, msg: &Message) {
        let frame = match msg.encode() {
            Ok(frame) => frame,
            Err(e) => {
                emit_network_event("client", LogLevel::Error, "encode_failed", None, Some(e.to_string()));
                return;
            }
        };
        let links = { self.inner.links.lock().await.clone() };
        for link in links {
            if self.inner.shutdown.load(Ordering::SeqCst) {
                continue;
            }
            if let Err(e) = link.send_frame(&frame).await {
                emit_network_event(
                    "client",
                    LogLevel::Error,
                    "frame_send_failed",
                    Some(link.remote().to_string()),
                    Some(e.to_string()),
                );
            }
        }
    }

    fn spawn_peer_refresh(&self) {
        let client = self.clone();
        tokio::spawn(async move {
            loop {
                sleep(PEER_REFRESH_INTERVAL).await;
                if client.inner.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                client.send_update_request().await;
            }
        });
    }

    /// Ask every router for the current peer set of our overlay network.
    pub async fn send_update_request(&self) {
        let msg = Message::compose(Command::Find, &self.identity(), &self.inner.network_id, "");
        self.broadcast(&msg).await;
    }

    /// Ask the routers for the known transport endpoints of one peer.
    pub async fn request_peer_endpoints(&self, id: &str) {
        let msg = Message::compose(Command::Node, &self.identity(), id, "");
        self.broadcast(&msg).await;
    }

    /// Request a relay toward `id`. Endpoints in `omit` are pipe-joined into
    /// the query so the router skips relays already observed failing.
    pub async fn request_control_peer(&self, id: &str, omit: &[SocketAddr]) {
        let mut query = String::new();
        for addr in omit {
            query.push_str(&addr.to_string());
            query.push('|');
        }
        let msg = Message {
            arguments: id.to_string(),
            command: Command::ControlPeer.tag().to_string(),
            id: self.identity(),
            payload: String::new(),
            query,
        };
        self.broadcast(&msg).await;
    }

    /// Register this client as a relay (Control Peer role). Waits until an
    /// identity has been assigned before transmitting.
    pub async fn register_control_peer(&self) {
        let mut rx = self.inner.identity.subscribe();
        while rx.borrow_and_update().len() != SESSION_ID_LEN {
            if self.inner.shutdown.load(Ordering::SeqCst) {
                return;
            }
            sleep(REGISTER_POLL_INTERVAL).await;
        }
        let msg = Message {
            arguments: self.inner.port.to_string(),
            command: Command::RegisterControlPeer.tag().to_string(),
            id: self.identity(),
            payload: String::new(),
            query: UNASSIGNED_ID.to_string(),
        };
        self.broadcast(&msg).await;
    }

    /// Report how many tunnels this relay currently serves (Control Peer
    /// role).
    pub async fn report_control_peer_load(&self, amount: u64) {
        let msg = Message {
            arguments: amount.to_string(),
            command: Command::Load.tag().to_string(),
            id: self.identity(),
            payload: String::new(),
            query: String::new(),
        };
        self.broadcast(&msg).await;
    }

    /// Ask the routers to lease us an overlay address.
    pub async fn request_ip(&self) {
        emit_network_event("client", LogLevel::Info, "address_lease_requested", None, None);
        let msg = Message::compose(Command::Dhcp, &self.identity(), "", "");
        self.broadcast(&msg).await;
    }

    /// Announce the overlay address and netmask this client already uses.
    pub async fn send_ip(&self, ip: &str, mask: &str) {
        emit_network_event("client", LogLevel::Info, "address_announced", None, None);
        let msg = Message::compose(Command::Dhcp, &self.identity(), ip, mask);
        self.broadcast(&msg).await;
    }

    /// Set the shutdown flag and send one STOP frame per connection. The
    /// receive loops exit on their next iteration; nothing else is written
    /// afterwards.
    pub async fn stop(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        let msg = Message {
            arguments: UNASSIGNED_ID.to_string(),
            command: Command::Stop.tag().to_string(),
            id: self.identity(),
            payload: String::new(),
            query: String::new(),
        };
        let frame = match msg.encode() {
            Ok(frame) => frame,
            Err(_) => return,
        };
        let links = { self.inner.links.lock().await.clone() };
        for link in links {
            let _ = link.send_frame(&frame).await;
        }
    }

    /// Session identity assigned by the routers; empty until the first CONN
    /// reply is accepted.
    pub fn identity(&self) -> String {
        self.inner.identity.borrow().clone()
    }

    pub fn state(&self) -> ClientState {
        *self.inner.state.lock()
    }

    /// When the routers last pinged us; staleness signals a dead control
    /// plane.
    pub fn last_ping(&self) -> Instant {
        *self.inner.last_ping.lock()
    }

    pub fn assigned_address(&self) -> Option<OverlayAddress> {
        *self.inner.assigned.lock()
    }

    pub async fn peers(&self) -> Vec<PeerEntry> {
        self.inner.peers.snapshot().await
    }

    pub async fn relays(&self) -> Vec<Relay> {
        self.inner.relays.relays().await
    }

    /// Every identity any router has ever mentioned, first-seen order.
    pub async fn last_catch(&self) -> Vec<String> {
        self.inner.peers.last_catch().await
    }

    pub async fn failed_routers(&self) -> Vec<String> {
        self.inner.failed_routers.lock().await.clone()
    }

    pub async fn live_routers(&self) -> Vec<SocketAddr> {
        self.inner.links.lock().await.iter().map(|l| l.remote()).collect()
    }

    /// Mark a relay endpoint dead: evicted from the cache and refused until
    /// the blacklist is cleared.
    pub async fn blacklist_relay(&self, addr: SocketAddr) {
        self.inner.relays.blacklist(addr).await;
    }

    pub async fn clear_relay_blacklist(&self) {
        emit_network_event("client", LogLevel::Debug, "relay_blacklist_cleared", None, None);
        self.inner.relays.clear_blacklist().await;
    }

    pub async fn blacklisted_relays(&self) -> Vec<SocketAddr> {
        self.inner.relays.blacklisted().await
    }
}

//! # Swarmgate
//!
//! Peer-discovery and rendezvous client for overlay networks.
//!
//! A [`DiscoveryClient`](network::DiscoveryClient) joins a logical overlay
//! network by speaking a small UDP request/response dialect with one or more
//! bootstrap routers: it acquires a session identity, keeps the set of
//! fellow members reconciled, resolves their transport endpoints, and —
//! when direct reachability fails — obtains relay (forwarder) endpoints.
//! Discovered peers and relays are delivered to the enclosing P2P engine
//! over channels; the data plane between peers is out of scope here.
//!
//! ## Design Principles
//! * Async-first: all I/O paths are non-blocking (Tokio).
//! * One cooperative receive task per router connection; outbound control
//!   messages fan out to every live connection.
//! * Nothing in the control plane raises to the caller after startup;
//!   failures surface as structured events, a `Reconnecting` state, or a
//!   stale liveness timestamp.
//! * Two roles: ordinary `Client`, and `ControlPeer` for members that also
//!   register themselves as relays.
//!
//! ## Key Modules
//! * `config` – Runtime configuration.
//! * `network` – Wire codec, router links, peer/relay tables, the client.
//! * `events` – Structured logging/events dispatcher.

pub mod config;
pub mod constants;
pub mod events;
pub mod network;
pub mod prelude; // curated stable-intent re-exports

pub use network::client::DiscoveryClient;

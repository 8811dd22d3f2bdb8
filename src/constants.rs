//! Central place for application-wide constants and default values.

use std::time::Duration;

/// Default bootstrap router list (comma-separated host:port entries).
pub const DEFAULT_ROUTERS: &str = "dht1.subut.ai:6881";

/// Protocol version tag sent in the handshake query field (bump when the
/// wire dialect changes).
pub const PROTOCOL_VERSION: &str = "1";

/// Session identity placeholder used before the router assigns one.
pub const UNASSIGNED_ID: &str = "0";

/// Length of a router-assigned session identity (UUID-shaped).
pub const SESSION_ID_LEN: usize = 36;

/// Receive buffer for one datagram; larger control messages are not
/// representable on this wire.
pub const DATAGRAM_BUF_LEN: usize = 512;

/// Consecutive read failures after which a router link is retired.
pub const READ_FAILURE_LIMIT: u32 = 1000;

/// Interval between periodic peer-set refresh requests.
pub const PEER_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Backoff applied when a router refuses our identity, before the handshake
/// is replayed.
pub const HANDSHAKE_BACKOFF: Duration = Duration::from_secs(3);

/// How long initialization waits for the first identity assignment.
pub const IDENTITY_WAIT: Duration = Duration::from_secs(3);

/// Poll interval while relay registration waits for an identity.
pub const REGISTER_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Application / crate version (populated from Cargo.toml via env! macro)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::constants::DEFAULT_ROUTERS;
use serde::Deserialize;
use std::net::IpAddr;

/// Role this client takes against the bootstrap routers.
///
/// A `Client` only discovers peers and consumes relay offers; a
/// `ControlPeer` additionally registers itself as a relay and reports load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    Client,
    ControlPeer,
}

impl Default for OperatingMode {
    fn default() -> Self {
        OperatingMode::Client
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Comma-separated bootstrap router addresses (host:port). Falls back
    /// to the built-in default list when unset.
    pub routers: Option<String>,
    /// Overlay network identifier; selects which peer set the routers
    /// return. Opaque to this client.
    pub network_id: String,
    /// Local data-plane port advertised to the routers during handshake.
    pub port: u16,
    /// Local addresses this client publishes as candidate endpoints.
    pub advertise_ips: Option<Vec<IpAddr>>,
    pub mode: Option<OperatingMode>,
    /// Logging / events configuration
    pub logging: Option<LoggingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routers: None,
            network_id: String::new(),
            port: 0,
            advertise_ips: None,
            mode: Some(OperatingMode::Client),
            logging: None,
        }
    }
}

impl Config {
    /// Split the configured router string into individual addresses,
    /// skipping empty entries.
    pub fn router_list(&self) -> Vec<String> {
        self.routers
            .as_deref()
            .unwrap_or(DEFAULT_ROUTERS)
            .split(',')
            .filter(|r| !r.is_empty())
            .map(|r| r.trim().to_string())
            .collect()
    }

    /// Effective operating mode; anything unset resolves to `Client`.
    pub fn mode(&self) -> OperatingMode {
        self.mode.unwrap_or_default()
    }

    pub fn advertise_ips(&self) -> Vec<IpAddr> {
        self.advertise_ips.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Path to JSON line event log (rotated). If unset, defaults to logs/swarmgate.jsonl
    pub json_path: Option<String>,
    /// Max size in bytes before rotation (default 5MB)
    pub json_max_bytes: Option<usize>,
    /// Number of rotated files to retain (default 3)
    pub json_rotate: Option<u32>,
    /// Disable console sink (default false)
    pub disable_console: Option<bool>,
}

//! Swarmgate public prelude (curated stable-intent exports).
//! Import with: `use swarmgate::prelude::*;`

pub use crate::config::{Config, LoggingConfig, OperatingMode};
pub use crate::network::client::{ClientState, DiscoveryClient, OverlayAddress};
pub use crate::network::message::{Command, Message};
pub use crate::network::peer_table::PeerEntry;
pub use crate::network::relay_table::Relay;

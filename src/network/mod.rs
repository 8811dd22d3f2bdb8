pub mod client;
pub mod error;
pub(crate) mod events;
pub mod message;
pub mod peer_table;
pub mod relay_table;
pub mod router;

pub use client::{ClientState, DiscoveryClient, OverlayAddress};
pub use error::{server_error_text, StartError, WireError};
pub use message::{Command, Message};
pub use peer_table::{PeerEntry, PeerTable};
pub use relay_table::{Relay, RelayTable};
pub use router::RouterLink;

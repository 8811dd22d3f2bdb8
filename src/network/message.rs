// src/network/message.rs

use crate::constants::UNASSIGNED_ID;
use crate::network::error::WireError;
use serde::{Deserialize, Serialize};

/// Control-plane command tags. Tags travel on the wire as short lowercase
/// byte strings; anything else is dropped by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Handshake / identity assignment
    Connect,
    /// Peer-set query and authoritative peer list
    Find,
    /// Endpoint resolution for one peer
    Node,
    /// Liveness probe
    Ping,
    /// Relay (control peer) request and offer
    ControlPeer,
    /// Router-initiated hint that a peer cannot reach us directly
    Notify,
    /// Drop a peer, or disconnect when bare
    Stop,
    /// Overlay address request / announcement
    Dhcp,
    /// Relay registration (control peer role)
    RegisterControlPeer,
    /// Relay load report (control peer role)
    Load,
    /// Identity refused by the router
    Unknown,
    /// Named server-side error
    Error,
}

impl Command {
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Connect => "conn",
            Command::Find => "find",
            Command::Node => "node",
            Command::Ping => "ping",
            Command::ControlPeer => "cp",
            Command::Notify => "notify",
            Command::Stop => "stop",
            Command::Dhcp => "dhcp",
            Command::RegisterControlPeer => "regcp",
            Command::Load => "load",
            Command::Unknown => "unknown",
            Command::Error => "error",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Command> {
        match tag {
            "conn" => Some(Command::Connect),
            "find" => Some(Command::Find),
            "node" => Some(Command::Node),
            "ping" => Some(Command::Ping),
            "cp" => Some(Command::ControlPeer),
            "notify" => Some(Command::Notify),
            "stop" => Some(Command::Stop),
            "dhcp" => Some(Command::Dhcp),
            "regcp" => Some(Command::RegisterControlPeer),
            "load" => Some(Command::Load),
            "unknown" => Some(Command::Unknown),
            "error" => Some(Command::Error),
            _ => None,
        }
    }
}

/// One control-plane datagram, both directions.
///
/// Serialized as a bencoded dictionary. Fields are declared in sorted key
/// order so the encoder produces a canonical (sorted-key) dictionary; every
/// field defaults to empty on decode so partial frames from older routers
/// still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "Arguments", default)]
    pub arguments: String,
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Payload", default)]
    pub payload: String,
    #[serde(rename = "Query", default)]
    pub query: String,
}

impl Message {
    /// Build an outbound request. Empty `id` and `query` collapse to the
    /// wire placeholder `"0"`; `arguments` is carried verbatim.
    pub fn compose(command: Command, id: &str, query: &str, arguments: &str) -> Message {
        Message {
            arguments: arguments.to_string(),
            command: command.tag().to_string(),
            id: if id.is_empty() {
                UNASSIGNED_ID.to_string()
            } else {
                id.to_string()
            },
            payload: String::new(),
            query: if query.is_empty() {
                UNASSIGNED_ID.to_string()
            } else {
                query.to_string()
            },
        }
    }

    /// Parsed command tag, if it is one we know.
    pub fn command(&self) -> Option<Command> {
        Command::from_tag(&self.command)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        if self.command.is_empty() {
            return Err(WireError::EmptyCommand);
        }
        Ok(serde_bencode::to_bytes(self)?)
    }

    /// Decode one datagram. Malformed buffers surface as an error for the
    /// caller to log; they must never abort a receive loop.
    pub fn decode(buf: &[u8]) -> Result<Message, WireError> {
        Ok(serde_bencode::from_bytes(buf)?)
    }
}

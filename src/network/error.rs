// src/network/error.rs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("refusing to encode a message without a command")]
    EmptyCommand,
    #[error("bencode error: {0}")]
    Bencode(#[from] serde_bencode::Error),
}

/// Initialization is the only operation that fails visibly; everything else
/// is reported through the event stream.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("no bootstrap router accepted the handshake")]
    NoRouters,
}

/// Canonical text for named server errors carried in the `Arguments` field
/// of an ERROR frame. Codes outside this table are logged as unknown.
pub fn server_error_text(code: &str) -> Option<&'static str> {
    match code {
        "cmd" => Some("router rejected an unsupported command"),
        "id" => Some("unknown or expired session identity"),
        "net" => Some("unknown overlay network identifier"),
        "cp" => Some("no control peer available for this network"),
        "dhcp" => Some("overlay address pool exhausted"),
        "args" => Some("malformed request arguments"),
        _ => None,
    }
}

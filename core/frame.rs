use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Author sentinel used for server-generated system messages
pub const SYSTEM_AUTHOR: &str = "System";

/// Outbound wire frame (client -> server)
///
/// The local-only identifier is stripped before transmission; only
/// these three fields go on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundChat {
    pub username: String,
    pub text: String,
    pub timestamp: i64,
}

/// A materialized chat event, ready for a consumer to display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    /// Server-assigned identifier when the frame carried one, otherwise
    /// a synthesized `author:timestamp:salt` fallback
    pub id: String,
    pub author: String,
    pub body: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// True for `system` frames (author is the System sentinel)
    pub system: bool,
}

impl ChatEvent {
    /// Synthesize a fallback identifier for a frame that lacks one
    ///
    /// Not guaranteed globally unique: two frames from the same author
    /// in the same millisecond collide with probability 2^-32. Good
    /// enough for client-side display keys; the server never needs it.
    pub fn synthesize_id(author: &str, timestamp: i64) -> String {
        format!("{}:{}:{:08x}", author, timestamp, rand::random::<u32>())
    }
}

/// Inbound `message` frame fields
#[derive(Debug, Deserialize)]
pub(crate) struct MessageFrame {
    pub username: String,
    pub text: String,
    pub timestamp: i64,
    #[serde(default)]
    pub id: Option<String>,
}

/// Inbound `system` frame fields
///
/// The author field is ignored on deserialization; system events always
/// carry the fixed sentinel.
#[derive(Debug, Deserialize)]
pub(crate) struct SystemFrame {
    pub text: String,
    pub timestamp: i64,
}

/// Inbound `users` frame fields
#[derive(Debug, Deserialize)]
pub(crate) struct UsersFrame {
    pub users: Vec<String>,
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

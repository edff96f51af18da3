//! Inbound frame classification
//!
//! Every raw textual frame received from the transport passes through
//! [`FrameRouter::classify`], which parses it as JSON, branches on the
//! `type` discriminator, and routes it to one of three sinks: chat
//! events, presence snapshots, or rejection. Classification fails soft:
//! malformed or unknown frames become [`Routed::Rejected`] and are
//! dropped by the caller, never propagated and never fatal.

use crate::frame::{ChatEvent, MessageFrame, SystemFrame, UsersFrame, SYSTEM_AUTHOR};
use serde_json::Value;
use tracing::debug;

/// Outcome of classifying one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// A chat or system message to display
    Chat(ChatEvent),
    /// A full replacement presence snapshot (empty clears presence)
    Presence(Vec<String>),
    /// Echo of the client's own send; recognized and dropped
    Suppressed,
    /// Malformed or unknown frame; dropped with diagnostics
    Rejected(RejectReason),
}

/// Why a frame was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Payload was not valid JSON
    Unparseable,
    /// Valid JSON but no string `type` discriminator
    MissingType,
    /// Discriminator not one of message/system/users; preserved verbatim
    UnknownType(String),
    /// Known discriminator but required fields missing or mistyped
    InvalidFields(String),
}

/// Parses and classifies inbound frames
///
/// When a local identity is configured, inbound `message` frames whose
/// author equals that identity are treated as the server's broadcast
/// echo of the client's own send and suppressed, since the local UI
/// already rendered the send optimistically. Suppression keys on the
/// username only: two physical clients sharing a username will suppress
/// each other's messages. That mirrors the wire protocol as deployed;
/// keying on the client-generated identifier would require the server
/// to round-trip it.
#[derive(Debug, Clone)]
pub struct FrameRouter {
    local_identity: Option<String>,
}

impl FrameRouter {
    /// Create a router, optionally filtering echoes of the given identity
    pub fn new(local_identity: Option<String>) -> Self {
        Self { local_identity }
    }

    /// The configured echo-filter identity, if any
    pub fn local_identity(&self) -> Option<&str> {
        self.local_identity.as_deref()
    }

    /// Classify one raw inbound frame
    pub fn classify(&self, raw: &str) -> Routed {
        let value: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                debug!("unparseable frame dropped: {}", e);
                return Routed::Rejected(RejectReason::Unparseable);
            }
        };

        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Routed::Rejected(RejectReason::MissingType);
        };

        match kind {
            "message" => match serde_json::from_value::<MessageFrame>(value.clone()) {
                Ok(frame) => {
                    if self
                        .local_identity
                        .as_deref()
                        .is_some_and(|me| me == frame.username)
                    {
                        debug!("own message echo suppressed");
                        return Routed::Suppressed;
                    }

                    let id = frame
                        .id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| {
                            ChatEvent::synthesize_id(&frame.username, frame.timestamp)
                        });

                    Routed::Chat(ChatEvent {
                        id,
                        author: frame.username,
                        body: frame.text,
                        timestamp: frame.timestamp,
                        system: false,
                    })
                }
                Err(_) => Routed::Rejected(RejectReason::InvalidFields("message".into())),
            },
            // System messages are always routed, never echo-filtered
            "system" => match serde_json::from_value::<SystemFrame>(value.clone()) {
                Ok(frame) => Routed::Chat(ChatEvent {
                    id: ChatEvent::synthesize_id(SYSTEM_AUTHOR, frame.timestamp),
                    author: SYSTEM_AUTHOR.to_string(),
                    body: frame.text,
                    timestamp: frame.timestamp,
                    system: true,
                }),
                Err(_) => Routed::Rejected(RejectReason::InvalidFields("system".into())),
            },
            "users" => match serde_json::from_value::<UsersFrame>(value.clone()) {
                Ok(frame) => Routed::Presence(frame.users),
                Err(_) => Routed::Rejected(RejectReason::InvalidFields("users".into())),
            },
            other => Routed::Rejected(RejectReason::UnknownType(other.to_string())),
        }
    }
}

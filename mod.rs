//! # chatwire
//!
//! A resilient WebSocket chat client core: persistent bidirectional
//! connection, automatic recovery with bounded exponential backoff, and
//! tagged routing of the inbound frame stream.
//!
//! ## Features
//!
//! - **Session controller**: tracks connection state, guarantees at
//!   most one live connection, reconnects on unexpected loss and stays
//!   down on explicit disconnect
//! - **Capped exponential backoff**: deterministic `base * 2^(n-1)`
//!   delays with a configured attempt maximum
//! - **Frame router**: classifies inbound frames (chat, system,
//!   presence), suppresses own-message echoes, fail-soft rejection of
//!   malformed payloads
//! - **Pluggable transport**: the socket seam is a trait, so tests run
//!   against a scripted fake without any network
//! - **Lock-free observation**: atomic session state and metrics,
//!   unbounded crossbeam event stream

pub mod core;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use core::{
    builder, config, connection_state, frame, retry, router, session, transport,
    builder::{states, SessionBuilder},
    config::{endpoint_with_identity, SessionConfig},
    connection_state::{AtomicMetrics, AtomicSessionState, SessionState},
    frame::{now_millis, ChatEvent, OutboundChat, SYSTEM_AUTHOR},
    retry::{RetryDecision, RetryState},
    router::{FrameRouter, RejectReason, Routed},
    session::{ChatSession, Metrics, SessionEvent},
    transport::{WebSocketLink, WebSocketTransport},
};

/// Create a new chat session builder
///
/// This is a convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let session = chatwire::builder()
///     .endpoint("ws://localhost:8080/ws?username=alice")
///     .identity("alice")
///     .reconnect_policy(ExponentialBackoff::new(Duration::from_secs(3), 5))
///     .build()
///     .await?;
/// ```
pub fn builder() -> SessionBuilder<states::NoEndpoint, states::NoIdentity> {
    SessionBuilder::new()
}

/// Type alias for Result with ChatWireError
pub type Result<T> = std::result::Result<T, traits::ChatWireError>;

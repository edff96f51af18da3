//! # chatwire traits
//!
//! Capability seams for the chatwire session controller:
//!
//! - **Transport / TransportLink**: socket-like connection factory and link,
//!   substitutable by a test double without any network
//! - **ReconnectPolicy**: controls retry timing after connection loss
//! - **ChatWireError**: crate-wide error taxonomy

pub mod error;
pub mod reconnect;
pub mod transport;

// Re-export commonly used types
pub use error::{ChatWireError, Result};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectPolicy};
pub use transport::{LinkEvent, Transport, TransportLink};

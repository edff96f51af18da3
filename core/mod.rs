//! # chatwire core
//!
//! Connection-management core for the chat client:
//!
//! - **Session controller**: one task owning the single live link,
//!   driving connect / routed-frame / reconnect cycles
//! - **Frame router**: tagged classification of inbound frames with
//!   fail-soft rejection
//! - **Atomic state and metrics**: lock-free, readable from any thread
//! - **Type-state builder**: endpoint and identity required at compile
//!   time
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatwire::{builder, endpoint_with_identity, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> chatwire::Result<()> {
//!     let session = chatwire::builder()
//!         .endpoint(endpoint_with_identity("ws://localhost:8080/ws", "alice"))
//!         .identity("alice")
//!         .build()
//!         .await?;
//!
//!     session.connect()?;
//!
//!     let local = session.send_chat("hello")?;
//!     println!("sent {}", local.id);
//!
//!     while let Ok(event) = session.recv_event() {
//!         match event {
//!             SessionEvent::Chat(msg) => println!("{}: {}", msg.author, msg.body),
//!             SessionEvent::Presence(users) => println!("online: {:?}", users),
//!             other => println!("{:?}", other),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod connection_state;
pub mod frame;
pub mod retry;
pub mod router;
pub mod session;
pub mod transport;

// Re-export main types
pub use builder::{states, SessionBuilder};
pub use config::{endpoint_with_identity, SessionConfig};
pub use connection_state::{AtomicMetrics, AtomicSessionState, SessionState};
pub use frame::{now_millis, ChatEvent, OutboundChat, SYSTEM_AUTHOR};
pub use retry::{RetryDecision, RetryState};
pub use router::{FrameRouter, RejectReason, Routed};
pub use session::{ChatSession, Metrics, SessionEvent};
pub use transport::{WebSocketLink, WebSocketTransport};

// Re-export traits for convenience
pub use crate::traits::*;

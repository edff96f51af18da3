use crate::error::Result;
use async_trait::async_trait;

/// An event emitted by an active transport link
///
/// Emission order for one link: zero-or-more `Message`, with `Error`
/// possibly interleaved, then exactly one terminal `Closed` (or a bare
/// stream end). An `Error` never substitutes for the terminal close;
/// the controller treats the close as authoritative.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Raw textual frame received from the wire
    Message(String),
    /// Transport-level error; informational, the link may still close
    Error(String),
    /// Terminal close with protocol code and reason
    Closed { code: u16, reason: String },
}

/// Factory capability for establishing transport links
///
/// The session controller is generic over this seam so tests can
/// substitute a scripted transport without any network.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a new link to the given endpoint
    ///
    /// A successful return corresponds to the transport `open` event;
    /// the handshake has completed and the link is live.
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportLink>>;
}

/// One live socket-like connection
///
/// Links are created and destroyed repeatedly across reconnect cycles;
/// none survive a close. Exactly one link is live per controller at any
/// instant and it is exclusively owned by the controller task.
#[async_trait]
pub trait TransportLink: Send {
    /// Write a textual payload verbatim to the wire
    async fn send(&mut self, payload: &str) -> Result<()>;

    /// Receive the next link event
    ///
    /// Returns `None` once the underlying stream has ended. Must be
    /// cancel-safe: dropping the returned future loses no events.
    async fn recv(&mut self) -> Option<LinkEvent>;

    /// Tear the link down; safe to call more than once
    async fn close(&mut self) -> Result<()>;
}

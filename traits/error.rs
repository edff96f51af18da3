use thiserror::Error;

/// Main error type for chatwire
#[derive(Error, Debug)]
pub enum ChatWireError {
    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Connection closed unexpectedly
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Send attempted while the session is not open
    #[error("not connected: {0}")]
    NotConnected(String),

    /// Inbound frame failed to parse or lacked a recognized discriminator
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Reconnection attempts exhausted
    #[error("reconnect exhausted after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// Channel send error
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid state transition
    #[error("invalid state transition: {0}")]
    InvalidState(String),
}

/// Result type for chatwire operations
pub type Result<T> = std::result::Result<T, ChatWireError>;

pub mod states;

use crate::config::SessionConfig;
use crate::router::FrameRouter;
use crate::session::ChatSession;
use crate::transport::WebSocketTransport;
use crate::traits::*;
use states::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Default backoff: 3s base delay, 5 attempts before giving up
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(3);
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Type-state builder for [`ChatSession`]
///
/// The endpoint URL and the local identity are required and enforced at
/// compile time; `build()` only exists once both are set. Everything
/// else has a sensible default: exponential backoff (3s base, 5
/// attempts), the real WebSocket transport, echo filtering on.
pub struct SessionBuilder<E, I, T = WebSocketTransport>
where
    E: EndpointState,
    I: IdentityState,
    T: Transport,
{
    _state: TypeState<E, I>,
    endpoint: Option<String>,
    identity: Option<String>,
    policy: Option<Box<dyn ReconnectPolicy>>,
    transport: T,
    shutdown_flag: Option<Arc<AtomicBool>>,
    echo_filter: bool,
}

impl SessionBuilder<NoEndpoint, NoIdentity, WebSocketTransport> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            endpoint: None,
            identity: None,
            policy: None,
            transport: WebSocketTransport::new(),
            shutdown_flag: None,
            echo_filter: true,
        }
    }
}

impl Default for SessionBuilder<NoEndpoint, NoIdentity, WebSocketTransport> {
    fn default() -> Self {
        Self::new()
    }
}

// Endpoint setting
impl<I, T> SessionBuilder<NoEndpoint, I, T>
where
    I: IdentityState,
    T: Transport,
{
    /// Set the connection endpoint (ws:// or wss:// URL)
    pub fn endpoint(self, endpoint: impl Into<String>) -> SessionBuilder<HasEndpoint, I, T> {
        SessionBuilder {
            _state: TypeState::new(),
            endpoint: Some(endpoint.into()),
            identity: self.identity,
            policy: self.policy,
            transport: self.transport,
            shutdown_flag: self.shutdown_flag,
            echo_filter: self.echo_filter,
        }
    }
}

// Identity setting
impl<E, T> SessionBuilder<E, NoIdentity, T>
where
    E: EndpointState,
    T: Transport,
{
    /// Set the local chat identity (username)
    ///
    /// Used as the author of outbound frames and, unless echo filtering
    /// is disabled, to suppress the server's broadcast of our own sends.
    pub fn identity(self, identity: impl Into<String>) -> SessionBuilder<E, HasIdentity, T> {
        SessionBuilder {
            _state: TypeState::new(),
            endpoint: self.endpoint,
            identity: Some(identity.into()),
            policy: self.policy,
            transport: self.transport,
            shutdown_flag: self.shutdown_flag,
            echo_filter: self.echo_filter,
        }
    }
}

// Optional configuration
impl<E, I, T> SessionBuilder<E, I, T>
where
    E: EndpointState,
    I: IdentityState,
    T: Transport,
{
    /// Set the reconnection policy
    pub fn reconnect_policy(mut self, policy: impl ReconnectPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Substitute the transport (a test double, for instance)
    pub fn transport<NT>(self, transport: NT) -> SessionBuilder<E, I, NT>
    where
        NT: Transport,
    {
        SessionBuilder {
            _state: TypeState::new(),
            endpoint: self.endpoint,
            identity: self.identity,
            policy: self.policy,
            transport,
            shutdown_flag: self.shutdown_flag,
            echo_filter: self.echo_filter,
        }
    }

    /// Set a custom shutdown flag for coordinated shutdown
    ///
    /// When the flag is set to `false` the controller will not attempt
    /// reconnection and will stop gracefully.
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Enable or disable suppression of own-message echoes (default on)
    pub fn echo_filter(mut self, enabled: bool) -> Self {
        self.echo_filter = enabled;
        self
    }
}

// Build method - only available when endpoint and identity are set
impl<T> SessionBuilder<HasEndpoint, HasIdentity, T>
where
    T: Transport,
{
    pub async fn build(self) -> Result<ChatSession> {
        let endpoint = self.endpoint.ok_or_else(|| {
            ChatWireError::Configuration("endpoint must be set".into())
        })?;
        let identity = self.identity.ok_or_else(|| {
            ChatWireError::Configuration("identity must be set".into())
        })?;

        if identity.is_empty() {
            return Err(ChatWireError::Configuration(
                "identity must not be empty".into(),
            ));
        }

        let shutdown_flag = self
            .shutdown_flag
            .unwrap_or_else(|| Arc::new(AtomicBool::new(true)));

        let policy = self.policy.unwrap_or_else(|| {
            Box::new(ExponentialBackoff::new(DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS))
        });

        let router = FrameRouter::new(self.echo_filter.then(|| identity.clone()));

        let config = SessionConfig {
            endpoint,
            identity,
            router,
            policy,
            transport: self.transport,
            shutdown_flag,
        };

        Ok(ChatSession::spawn(config))
    }
}

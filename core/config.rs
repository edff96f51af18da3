use crate::router::FrameRouter;
use crate::traits::{ReconnectPolicy, Transport};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Configuration for a chat session controller
///
/// Built by the type-state [`SessionBuilder`](crate::builder::SessionBuilder)
/// and moved into the controller task.
pub struct SessionConfig<T>
where
    T: Transport,
{
    /// Endpoint URL; immutable for the controller's lifetime. Changing
    /// it means tearing down and building a new controller.
    pub(crate) endpoint: String,

    /// Local chat identity, used for outbound frames and echo filtering
    pub(crate) identity: String,

    /// Inbound frame classifier
    pub(crate) router: FrameRouter,

    /// Retry timing after unexpected loss
    pub(crate) policy: Box<dyn ReconnectPolicy>,

    /// Link factory
    pub(crate) transport: T,

    /// When false, the controller stops and will not reconnect
    pub(crate) shutdown_flag: Arc<AtomicBool>,
}

impl<T> SessionConfig<T>
where
    T: Transport,
{
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Build a chat endpoint URL carrying the identity in the query string
///
/// The server reads the chosen name from `?username=<name>`.
pub fn endpoint_with_identity(base_url: &str, username: &str) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!("{}{}username={}", base_url, sep, username)
}

//! Chat session controller
//!
//! Composes a [`Transport`] and a [`ReconnectPolicy`](crate::traits::ReconnectPolicy)
//! into one externally-facing unit: tracks connection state, routes
//! inbound frames, triggers reconnection on unexpected loss with
//! bounded exponential backoff, and suppresses reconnection on explicit
//! disconnect. All transport-level failures are absorbed here and
//! converted into [`SessionEvent`]s; none reach consumers as errors.
//!
//! One tokio task owns the single live transport link. User-facing
//! calls communicate with it over an unbounded crossbeam command
//! channel, so no locks guard controller state. Commands are drained
//! with non-blocking `try_recv` between awaits, never a cancellable
//! blocking receive, so none are lost.

use crate::config::SessionConfig;
use crate::connection_state::{AtomicMetrics, AtomicSessionState, SessionState};
use crate::frame::{now_millis, ChatEvent, OutboundChat};
use crate::retry::{RetryDecision, RetryState};
use crate::router::{FrameRouter, Routed};
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often the controller re-checks commands and the shutdown flag
/// while blocked on the link or a backoff timer
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Slice size for the interruptible backoff wait
const BACKOFF_SLICE: Duration = Duration::from_millis(100);

/// Internal command messages for controller control
#[derive(Debug)]
enum SessionCommand {
    /// Establish (or re-establish) the connection
    Connect,
    /// Tear the connection down and stay down
    Disconnect,
    /// Write a serialized frame to the wire
    Send(String),
    /// Stop the controller task
    Shutdown,
}

/// Tagged event stream emitted by the controller
///
/// Consumers subscribe by receiving from the session's event channel;
/// `Connected`/`Disconnected` carry the connected-changed signal,
/// `Chat`/`Presence` the routed frame stream.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connection established, sends accepted
    Connected,
    /// Connection lost or closed
    Disconnected,
    /// Retry scheduled (attempt number, 1-indexed)
    Reconnecting(u32),
    /// All retry attempts consumed; disconnected and not retrying until
    /// the next explicit connect
    ReconnectExhausted,
    /// A routed chat or system message
    Chat(ChatEvent),
    /// Full replacement presence snapshot
    Presence(Vec<String>),
    /// Transport-level error; informational, close events are authoritative
    Error(String),
}

/// Session metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub frames_rejected: u64,
    pub session_state: SessionState,
}

/// Why an active link stopped being driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    /// Unexpected loss; reconnection may be scheduled
    Lost,
    /// Explicit disconnect; no reconnection
    Explicit,
    /// Controller shutting down
    Shutdown,
}

/// What ended a backoff wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackoffOutcome {
    Elapsed,
    /// Explicit disconnect cancelled the pending retry
    Cancelled,
    /// Manual connect during the wait; retry immediately with a fresh counter
    Restart,
    Shutdown,
}

/// Resilient chat session controller
///
/// Created once per active chat identity via [`builder`](crate::builder)
/// and destroyed when the user leaves the chat. Guarantees at most one
/// live transport link at any instant.
pub struct ChatSession {
    identity: String,
    state: Arc<AtomicSessionState>,
    metrics: Arc<AtomicMetrics>,
    command_tx: Sender<SessionCommand>,
    event_rx: Receiver<SessionEvent>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
    shutdown_flag: Arc<AtomicBool>,
}

impl ChatSession {
    /// Spawn the controller task for the given configuration
    ///
    /// Called by the builder's `build()`.
    pub(crate) fn spawn<T>(config: SessionConfig<T>) -> Self
    where
        T: Transport,
    {
        let identity = config.identity.clone();
        let state = Arc::new(AtomicSessionState::new(SessionState::Idle));
        let metrics = Arc::new(AtomicMetrics::new());
        let shutdown_flag = Arc::clone(&config.shutdown_flag);

        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let task_handle = {
            let state = Arc::clone(&state);
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move {
                run_session(config, state, metrics, command_rx, event_tx).await;
            })
        };

        Self {
            identity,
            state,
            metrics,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
            shutdown_flag,
        }
    }

    /// Establish the connection, retrying automatically on loss
    ///
    /// Resets the attempt counter. A call while already connecting or
    /// open is a logged no-op, guaranteeing at most one live link.
    pub fn connect(&self) -> Result<()> {
        match self.state.get() {
            SessionState::Connecting | SessionState::Open => {
                debug!("connect skipped, session already connecting or open");
                Ok(())
            }
            _ => self.send_command(SessionCommand::Connect),
        }
    }

    /// Tear the connection down and cancel any pending retry
    ///
    /// After this returns no automatic reconnect will happen until the
    /// next explicit [`connect`](Self::connect).
    pub fn disconnect(&self) -> Result<()> {
        self.send_command(SessionCommand::Disconnect)
    }

    /// Send a chat message
    ///
    /// Builds the outbound wire frame, strips the local identifier, and
    /// returns the materialized [`ChatEvent`] so the caller can render
    /// its own send optimistically. Fails with
    /// [`ChatWireError::NotConnected`] while the session is not open;
    /// this is a reported no-op, nothing is queued.
    pub fn send_chat(&self, text: &str) -> Result<ChatEvent> {
        if !self.state.is_open() {
            return Err(ChatWireError::NotConnected(
                "cannot send while disconnected".into(),
            ));
        }

        let timestamp = now_millis();
        let outbound = OutboundChat {
            username: self.identity.clone(),
            text: text.to_string(),
            timestamp,
        };
        let wire = serde_json::to_string(&outbound)
            .map_err(|e| ChatWireError::MalformedFrame(e.to_string()))?;

        self.send_command(SessionCommand::Send(wire))?;

        Ok(ChatEvent {
            id: ChatEvent::synthesize_id(&self.identity, timestamp),
            author: self.identity.clone(),
            body: text.to_string(),
            timestamp,
            system: false,
        })
    }

    /// The local chat identity
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current connection state
    #[inline]
    pub fn session_state(&self) -> SessionState {
        self.state.get()
    }

    /// Check if the session is open
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_open()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            reconnect_count: self.metrics.reconnect_count(),
            frames_rejected: self.metrics.frames_rejected(),
            session_state: self.state.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> std::result::Result<SessionEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// A cloned handle to the event stream, for a dedicated consumer
    pub fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    /// Get a reference to the shutdown flag
    ///
    /// Setting it to `false` stops the controller and prevents any
    /// further reconnection.
    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown_flag
    }

    /// Shut the controller down and wait for its task to finish
    pub async fn shutdown(mut self) -> Result<()> {
        info!("shutting down chat session");
        self.shutdown_flag.store(false, Ordering::Release);
        let _ = self.command_tx.send(SessionCommand::Shutdown);
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }

    fn send_command(&self, command: SessionCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| ChatWireError::ChannelSend(e.to_string()))
    }
}

/// Main controller task loop
///
/// Outer loop: wait idle for a connect command. Inner loop: one connect
/// cycle per iteration — attempt, drive the link until it closes, then
/// consult the retry state for what to do next.
async fn run_session<T>(
    config: SessionConfig<T>,
    state: Arc<AtomicSessionState>,
    metrics: Arc<AtomicMetrics>,
    command_rx: Receiver<SessionCommand>,
    event_tx: Sender<SessionEvent>,
) where
    T: Transport,
{
    let mut retry = RetryState::new();
    let shutdown_flag = Arc::clone(&config.shutdown_flag);

    'idle: loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            debug!("shutdown flag is false, exiting controller loop");
            break;
        }

        let Some(command) = next_command(&command_rx).await else {
            continue;
        };
        match command {
            SessionCommand::Connect => {}
            SessionCommand::Disconnect => {
                debug!("disconnect while already down");
                state.set(SessionState::Idle);
                continue;
            }
            SessionCommand::Send(_) => {
                warn!("send dropped, session not connected");
                continue;
            }
            SessionCommand::Shutdown => break,
        }

        // Explicit connect: fresh counter
        retry.reset();

        'connect: loop {
            if !shutdown_flag.load(Ordering::Acquire) {
                break 'idle;
            }

            retry.begin_cycle();
            state.set(SessionState::Connecting);
            if retry.attempt() > 0 {
                let _ = event_tx.send(SessionEvent::Reconnecting(retry.attempt()));
                metrics.increment_reconnects();
            }

            match config.transport.connect(&config.endpoint).await {
                Ok(mut link) => {
                    state.set(SessionState::Open);
                    retry.record_open();
                    let _ = event_tx.send(SessionEvent::Connected);

                    let outcome = drive_link(
                        link.as_mut(),
                        &config.router,
                        &metrics,
                        &command_rx,
                        &event_tx,
                        &shutdown_flag,
                    )
                    .await;

                    // The link is never reused across cycles
                    drop(link);
                    state.set(SessionState::Closed);
                    let _ = event_tx.send(SessionEvent::Disconnected);

                    match outcome {
                        LinkOutcome::Explicit => {
                            retry.force_exhausted();
                            state.set(SessionState::Idle);
                            continue 'idle;
                        }
                        LinkOutcome::Shutdown => break 'idle,
                        LinkOutcome::Lost => {}
                    }
                }
                Err(e) => {
                    error!("failed to connect to {}: {}", config.endpoint, e);
                    let _ = event_tx.send(SessionEvent::Error(e.to_string()));
                    state.set(SessionState::Closed);
                }
            }

            if !shutdown_flag.load(Ordering::Acquire) {
                break 'idle;
            }

            match retry.record_loss(config.policy.as_ref()) {
                RetryDecision::Backoff(delay) => {
                    info!(
                        "reconnecting in {:?} (attempt {})",
                        delay,
                        retry.attempt()
                    );
                    match wait_backoff(delay, &command_rx, &shutdown_flag).await {
                        BackoffOutcome::Elapsed => continue 'connect,
                        BackoffOutcome::Restart => {
                            debug!("manual connect during backoff, retrying now");
                            retry.reset();
                            continue 'connect;
                        }
                        BackoffOutcome::Cancelled => {
                            debug!("pending reconnect cancelled by disconnect");
                            retry.force_exhausted();
                            state.set(SessionState::Idle);
                            continue 'idle;
                        }
                        BackoffOutcome::Shutdown => break 'idle,
                    }
                }
                RetryDecision::GiveUp => {
                    warn!(
                        "reconnect attempts exhausted after {} attempts",
                        retry.attempt()
                    );
                    let _ = event_tx.send(SessionEvent::ReconnectExhausted);
                    // Stay Closed; only an explicit connect resets
                    continue 'idle;
                }
                RetryDecision::AlreadyGivenUp => continue 'idle,
            }
        }
    }

    state.set(SessionState::Idle);
    info!("chat session controller task exiting");
}

/// Drive one live link until it closes
async fn drive_link(
    link: &mut dyn TransportLink,
    router: &FrameRouter,
    metrics: &AtomicMetrics,
    command_rx: &Receiver<SessionCommand>,
    event_tx: &Sender<SessionEvent>,
    shutdown_flag: &AtomicBool,
) -> LinkOutcome {
    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            let _ = link.close().await;
            return LinkOutcome::Shutdown;
        }

        // Drain commands losslessly before blocking on the link
        loop {
            match command_rx.try_recv() {
                Ok(SessionCommand::Send(payload)) => {
                    if let Err(e) = link.send(&payload).await {
                        warn!("send failed: {}", e);
                        let _ = event_tx.send(SessionEvent::Error(e.to_string()));
                        let _ = link.close().await;
                        return LinkOutcome::Lost;
                    }
                    metrics.increment_sent();
                }
                Ok(SessionCommand::Connect) => {
                    debug!("connect ignored, session already open");
                }
                Ok(SessionCommand::Disconnect) => {
                    info!("explicit disconnect");
                    let _ = link.close().await;
                    return LinkOutcome::Explicit;
                }
                Ok(SessionCommand::Shutdown) => {
                    let _ = link.close().await;
                    return LinkOutcome::Shutdown;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("command channel closed");
                    let _ = link.close().await;
                    return LinkOutcome::Shutdown;
                }
            }
        }

        tokio::select! {
            ev = link.recv() => match ev {
                Some(LinkEvent::Message(raw)) => {
                    metrics.increment_received();
                    route_frame(router, &raw, metrics, event_tx);
                }
                Some(LinkEvent::Error(e)) => {
                    // Informational only; the close event is authoritative
                    error!("transport error: {}", e);
                    let _ = event_tx.send(SessionEvent::Error(e));
                }
                Some(LinkEvent::Closed { code, reason }) => {
                    info!("connection closed (code {}): {}", code, reason);
                    return LinkOutcome::Lost;
                }
                None => {
                    warn!("transport stream ended");
                    return LinkOutcome::Lost;
                }
            },
            _ = tokio::time::sleep(COMMAND_POLL_INTERVAL) => {
                // Re-check commands and the shutdown flag
            }
        }
    }
}

/// Route one classified frame to the event stream
fn route_frame(
    router: &FrameRouter,
    raw: &str,
    metrics: &AtomicMetrics,
    event_tx: &Sender<SessionEvent>,
) {
    match router.classify(raw) {
        Routed::Chat(event) => {
            let _ = event_tx.send(SessionEvent::Chat(event));
        }
        Routed::Presence(users) => {
            let _ = event_tx.send(SessionEvent::Presence(users));
        }
        Routed::Suppressed => {}
        Routed::Rejected(reason) => {
            metrics.increment_rejected();
            warn!("inbound frame dropped: {:?}", reason);
        }
    }
}

/// Wait for one command while idle, polling the shutdown flag
async fn next_command(command_rx: &Receiver<SessionCommand>) -> Option<SessionCommand> {
    match command_rx.try_recv() {
        Ok(command) => Some(command),
        Err(TryRecvError::Empty) => {
            tokio::time::sleep(COMMAND_POLL_INTERVAL).await;
            None
        }
        Err(TryRecvError::Disconnected) => Some(SessionCommand::Shutdown),
    }
}

/// Interruptible backoff wait
///
/// Suspends only the retry path: commands keep being observed, so an
/// explicit disconnect cancels the pending retry before it fires and a
/// manual connect restarts immediately. A cancelled wait leaves no
/// stale timer behind, the slice loop simply stops.
async fn wait_backoff(
    delay: Duration,
    command_rx: &Receiver<SessionCommand>,
    shutdown_flag: &AtomicBool,
) -> BackoffOutcome {
    let mut elapsed = Duration::ZERO;

    loop {
        if !shutdown_flag.load(Ordering::Acquire) {
            return BackoffOutcome::Shutdown;
        }

        loop {
            match command_rx.try_recv() {
                Ok(SessionCommand::Disconnect) => return BackoffOutcome::Cancelled,
                Ok(SessionCommand::Connect) => return BackoffOutcome::Restart,
                Ok(SessionCommand::Send(_)) => {
                    warn!("send dropped, session not connected");
                }
                Ok(SessionCommand::Shutdown) => return BackoffOutcome::Shutdown,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return BackoffOutcome::Shutdown,
            }
        }

        if elapsed >= delay {
            return BackoffOutcome::Elapsed;
        }

        let slice = std::cmp::min(BACKOFF_SLICE, delay - elapsed);
        tokio::time::sleep(slice).await;
        elapsed += slice;
    }
}

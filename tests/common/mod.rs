//! Common test utilities for chatwire integration tests
//!
//! Provides a scripted transport that substitutes for the network: each
//! `connect()` consumes the next script entry (refusal or a served
//! link), inbound events are injected by the test, and outbound
//! payloads are captured for inspection.

use async_trait::async_trait;
use chatwire::{ChatWireError, LinkEvent, Result, SessionEvent, Transport, TransportLink};
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use std::sync::Once;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

static LOG_INIT: Once = Once::new();

/// Install the tracing subscriber once, honoring `RUST_LOG`
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

enum ConnectScript {
    /// Fail the connection attempt
    Refuse,
    /// Serve a scripted link
    Serve(ScriptedLink),
}

struct Inner {
    scripts: Mutex<VecDeque<ConnectScript>>,
    connect_count: AtomicUsize,
}

/// Transport double with per-attempt scripts
///
/// Attempts beyond the script are refused, which makes "server down"
/// scenarios the default.
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                scripts: Mutex::new(VecDeque::new()),
                connect_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue a refused connection attempt
    #[allow(dead_code)]
    pub fn push_refusal(&self) {
        self.inner
            .scripts
            .lock()
            .unwrap()
            .push_back(ConnectScript::Refuse);
    }

    /// Queue a successful connection attempt, returning its handle
    pub fn push_link(&self) -> LinkHandle {
        let (event_tx, event_rx) = unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let link = ScriptedLink {
            events: event_rx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        self.inner
            .scripts
            .lock()
            .unwrap()
            .push_back(ConnectScript::Serve(link));

        LinkHandle {
            events: event_tx,
            sent,
            closed,
        }
    }

    /// How many connection attempts the controller has made
    pub fn connect_count(&self) -> usize {
        self.inner.connect_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, _endpoint: &str) -> Result<Box<dyn TransportLink>> {
        self.inner.connect_count.fetch_add(1, Ordering::SeqCst);
        let script = self.inner.scripts.lock().unwrap().pop_front();
        match script {
            Some(ConnectScript::Serve(link)) => Ok(Box::new(link)),
            Some(ConnectScript::Refuse) | None => {
                Err(ChatWireError::Transport("connection refused".into()))
            }
        }
    }
}

/// Test-side handle to one scripted link
pub struct LinkHandle {
    events: UnboundedSender<LinkEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl LinkHandle {
    /// Inject an inbound textual frame
    pub fn inject(&self, raw: &str) {
        let _ = self.events.send(LinkEvent::Message(raw.to_string()));
    }

    /// Inject a transport-level error (not a close)
    #[allow(dead_code)]
    pub fn inject_error(&self, message: &str) {
        let _ = self.events.send(LinkEvent::Error(message.to_string()));
    }

    /// Close the link from the server side
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.events.send(LinkEvent::Closed {
            code,
            reason: reason.to_string(),
        });
    }

    /// Payloads the controller wrote to the wire
    pub fn sent_payloads(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Whether the controller tore the link down
    #[allow(dead_code)]
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct ScriptedLink {
    events: UnboundedReceiver<LinkEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl TransportLink for ScriptedLink {
    async fn send(&mut self, payload: &str) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChatWireError::Transport("link closed".into()));
        }
        self.sent.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    async fn recv(&mut self) -> Option<LinkEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Block until an event matching the predicate arrives
///
/// Non-matching events are discarded. Call from the test thread only;
/// controller tasks run on other runtime workers.
pub fn wait_for_event<F>(
    rx: &Receiver<SessionEvent>,
    timeout: Duration,
    mut pred: F,
) -> Option<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            return None;
        };
        match rx.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return Some(event),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

/// Collect everything currently queued on the event stream
#[allow(dead_code)]
pub fn drain_events(rx: &Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll a condition until it holds or the timeout elapses
pub fn poll_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Connection state of a chat session
///
/// Owned exclusively by the session controller; the transport reports
/// transitions but holds no authoritative state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// No connection and none pending
    Idle = 0,
    /// A connection attempt (initial or retry) is in flight
    Connecting = 1,
    /// Live connection, sends accepted
    Open = 2,
    /// Connection lost or given up; no attempt currently in flight
    Closed = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Connecting,
            2 => SessionState::Open,
            3 => SessionState::Closed,
            _ => SessionState::Idle,
        }
    }
}

/// Lock-free session state holder
///
/// Plain atomic load/store; no locks are needed because only the
/// controller task writes, everyone else reads.
#[derive(Debug)]
pub struct AtomicSessionState {
    inner: AtomicU8,
}

impl AtomicSessionState {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: SessionState) {
        self.inner.store(state as u8, Ordering::Release);
    }

    /// Transition only if the current state matches `from`
    pub fn compare_exchange(
        &self,
        from: SessionState,
        to: SessionState,
    ) -> std::result::Result<SessionState, SessionState> {
        self.inner
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(SessionState::from_u8)
            .map_err(SessionState::from_u8)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == SessionState::Open
    }

    #[inline]
    pub fn is_connecting(&self) -> bool {
        self.get() == SessionState::Connecting
    }

    #[inline]
    pub fn is_idle(&self) -> bool {
        self.get() == SessionState::Idle
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.get() == SessionState::Closed
    }
}

/// Lock-free counters for session activity
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    reconnect_count: AtomicU64,
    frames_rejected: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected.load(Ordering::Relaxed)
    }
}

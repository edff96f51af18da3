//! Per-controller reconnect bookkeeping
//!
//! The attempt counter, exhaustion latch and connect-cycle generation
//! live in one explicit value object owned by the session controller,
//! rather than in captured mutable cells, so tests can construct and
//! inspect it directly.

use crate::traits::ReconnectPolicy;
use std::time::Duration;

/// What to do after an unexpected connection loss
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then reconnect
    Backoff(Duration),
    /// Policy just gave up; report exhaustion (fires once)
    GiveUp,
    /// Already exhausted earlier; nothing to report
    AlreadyGivenUp,
}

/// Reconnect state for one session controller
#[derive(Debug, Default)]
pub struct RetryState {
    attempt: u32,
    generation: u64,
    exhausted: bool,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry attempts consumed since the last open or explicit connect
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Current connect-cycle generation token
    ///
    /// Bumped on every connection attempt; a handle from an earlier
    /// generation is stale and must not act on the current session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Start a new connect cycle, returning its generation token
    pub fn begin_cycle(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Reset for an explicit `connect()` call
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.exhausted = false;
    }

    /// Record a successful open transition
    pub fn record_open(&mut self) {
        self.attempt = 0;
        self.exhausted = false;
    }

    /// Record an unexpected loss and consult the policy
    ///
    /// Once the policy has given up, further losses return
    /// [`RetryDecision::AlreadyGivenUp`] without consulting the policy
    /// again and without moving the counter.
    pub fn record_loss(&mut self, policy: &dyn ReconnectPolicy) -> RetryDecision {
        if self.exhausted {
            return RetryDecision::AlreadyGivenUp;
        }

        self.attempt = self.attempt.saturating_add(1);
        match policy.delay(self.attempt) {
            Some(delay) => RetryDecision::Backoff(delay),
            None => {
                self.exhausted = true;
                RetryDecision::GiveUp
            }
        }
    }

    /// Mark the counter exhausted so no retry is scheduled
    ///
    /// Used by explicit `disconnect()` to suppress reconnection even if
    /// a close event is still in flight.
    pub fn force_exhausted(&mut self) {
        self.exhausted = true;
    }
}

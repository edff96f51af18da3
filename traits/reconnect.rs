use std::time::Duration;

/// Trait for deciding whether and when to retry after a connection loss
///
/// The controller consults the policy once per unexpected close. Attempt
/// numbers are 1-indexed: the first retry after a loss is attempt 1.
pub trait ReconnectPolicy: Send + Sync {
    /// Get the delay before the given reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (1-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Give up, stop reconnecting
    fn delay(&self, attempt: u32) -> Option<Duration>;

    /// Check if the policy still allows the given attempt
    fn allows(&self, attempt: u32) -> bool {
        self.delay(attempt).is_some()
    }
}

/// Capped exponential backoff
///
/// Delays between reconnection attempts grow exponentially:
/// `base_delay * 2^(attempt - 1)`, with the number of attempts capped
/// at `max_attempts`. The delay itself is unbounded but saturates
/// instead of overflowing.
///
/// Deterministic: the same attempt number always yields the same delay.
/// No jitter is applied; wrap this policy if randomized spreading is
/// ever needed.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_attempts: u32,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff policy
    ///
    /// # Arguments
    /// * `base_delay` - Delay before the first retry
    /// * `max_attempts` - Attempts allowed before giving up
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// The configured attempt cap
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        Some(Duration::from_millis(base_ms.saturating_mul(factor)))
    }
}

/// Fixed delay between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Create a new fixed delay policy
    ///
    /// # Arguments
    /// * `delay` - The fixed delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl ReconnectPolicy for FixedDelay {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        match self.max_attempts {
            Some(max) if attempt > max => None,
            _ => Some(self.delay),
        }
    }
}

/// Never reconnect
///
/// The controller will not retry after a disconnection.
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectPolicy for NeverReconnect {
    fn delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}

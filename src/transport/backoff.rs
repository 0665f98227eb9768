//! Retry delay schedule for the connect loop.

use std::time::Duration;

use crate::core::constants::{RETRY_DELAY_INITIAL, RETRY_DELAY_MAX};

/// Exponential backoff: a fixed initial delay that doubles after each
/// failed attempt, capped at a maximum.
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    initial: Duration,
    max: Duration,
    next: Duration,
}

impl RetryBackoff {
    /// Create a backoff with a custom schedule.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            next: initial,
        }
    }

    /// The delay to wait before the next attempt; doubles the following
    /// delay up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (delay * 2).min(self.max);
        delay
    }

    /// Restart the schedule from the initial delay.
    pub fn reset(&mut self) {
        self.next = self.initial;
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(RETRY_DELAY_INITIAL, RETRY_DELAY_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_capped() {
        let mut backoff = RetryBackoff::default();
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = RetryBackoff::default();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), RETRY_DELAY_INITIAL);
    }

    #[test]
    fn test_custom_schedule() {
        let mut backoff = RetryBackoff::new(Duration::from_millis(10), Duration::from_millis(25));
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(25));
    }
}

//! Connection retry policy.
//!
//! A session gets a bounded number of connection attempts. After the last one
//! fails the client is dropped and rebuilt from scratch after a back-off.

use std::time::Duration;

/// Connection attempts per session.
pub const MAX_CONNECT_ATTEMPTS: u32 = 10;

/// Wait between two attempts of the same session.
pub const ATTEMPT_SPACING: Duration = Duration::from_secs(1);

/// Wait before rebuilding an abandoned session.
pub const SESSION_BACKOFF: Duration = Duration::from_secs(5);

/// What to do after a failed connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Try again on the same session after the delay
    Retry(Duration),
    /// Abandon the session; rebuild after the delay
    GiveUp {
        /// Attempts made in the abandoned session
        attempts: u32,
        /// Back-off before the next session
        backoff: Duration,
    },
}

/// Attempt counter for one session.
#[derive(Debug, Clone, Default)]
pub struct Reconnect {
    attempts: u32,
}

impl Reconnect {
    /// Start counting for a fresh session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts failed so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record a failed attempt.
    pub fn on_failure(&mut self) -> Step {
        self.attempts += 1;
        if self.attempts < MAX_CONNECT_ATTEMPTS {
            Step::Retry(ATTEMPT_SPACING)
        } else {
            let attempts = std::mem::take(&mut self.attempts);
            Step::GiveUp {
                attempts,
                backoff: SESSION_BACKOFF,
            }
        }
    }

    /// Record a successful connection.
    pub fn on_connected(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gives_up_after_ten_attempts() {
        let mut reconnect = Reconnect::new();

        for _ in 1..MAX_CONNECT_ATTEMPTS {
            assert_eq!(reconnect.on_failure(), Step::Retry(Duration::from_secs(1)));
        }
        assert_eq!(
            reconnect.on_failure(),
            Step::GiveUp {
                attempts: 10,
                backoff: Duration::from_secs(5)
            }
        );
        assert_eq!(reconnect.attempts(), 0);
    }

    #[test]
    fn success_resets_budget() {
        let mut reconnect = Reconnect::new();
        for _ in 0..7 {
            reconnect.on_failure();
        }
        reconnect.on_connected();

        for _ in 1..MAX_CONNECT_ATTEMPTS {
            assert!(matches!(reconnect.on_failure(), Step::Retry(_)));
        }
    }
}

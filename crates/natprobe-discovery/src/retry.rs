//! Retransmission policy for STUN requests.

use std::time::Duration;

/// Default number of attempts per request
pub const DEFAULT_ATTEMPTS: u32 = 7;

/// Default wait for the first attempt
pub const DEFAULT_INITIAL_RTO: Duration = Duration::from_millis(500);

/// Attempt count and exponential backoff for one request.
///
/// Attempt `n` (zero-based) waits `initial_rto * 2^n`, so the defaults give
/// 500, 1000, 2000, 4000, 8000, 16000 and 32000 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of send-then-wait attempts
    pub attempts: u32,
    /// Wait after the first send; doubled for every later attempt
    pub initial_rto: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            initial_rto: DEFAULT_INITIAL_RTO,
        }
    }
}

impl RetryPolicy {
    /// Wait for each attempt, in order
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.attempts)
            .map(|attempt| {
                2u32.checked_pow(attempt)
                    .map_or(Duration::MAX, |factor| self.initial_rto.saturating_mul(factor))
            })
            .collect()
    }

    /// Upper bound on the time spent waiting for one request
    #[must_use]
    pub fn total_wait(&self) -> Duration {
        self.schedule()
            .into_iter()
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let expected: Vec<Duration> = [500, 1000, 2000, 4000, 8000, 16000, 32000]
            .into_iter()
            .map(Duration::from_millis)
            .collect();
        assert_eq!(RetryPolicy::default().schedule(), expected);
    }

    #[test]
    fn test_total_wait() {
        assert_eq!(
            RetryPolicy::default().total_wait(),
            Duration::from_millis(63_500)
        );
    }

    #[test]
    fn test_zero_attempts() {
        let policy = RetryPolicy {
            attempts: 0,
            initial_rto: Duration::from_millis(10),
        };
        assert!(policy.schedule().is_empty());
        assert_eq!(policy.total_wait(), Duration::ZERO);
    }

    #[test]
    fn test_schedule_saturates() {
        let policy = RetryPolicy {
            attempts: 40,
            initial_rto: Duration::from_secs(u64::MAX / 2),
        };
        let schedule = policy.schedule();
        assert_eq!(schedule.len(), 40);
        assert_eq!(schedule[39], Duration::MAX);
    }
}

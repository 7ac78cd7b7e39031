// Exponential backoff with jitter for the `http_request` action's transport
// call. Scoped to that one handler rather than a generic HTTP client wrapper,
// so a retried-then-failed request surfaces as an ordinary step failure.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_coefficient: f64,
}

impl RetryPolicy {
    pub fn exponential() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            backoff_coefficient: 2.0,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.backoff_coefficient.powi(attempt as i32 - 1);
        let base = self.initial_interval.as_secs_f64() * exp;
        let capped = base.min(self.max_interval.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.0..=capped * 0.1);
        Duration::from_secs_f64(capped + jitter)
    }

    pub fn has_attempts_remaining(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }
}

/// Whether an HTTP outcome is worth retrying: network/timeout failures and 5xx,
/// never 4xx (those are the caller's fault and retrying won't help).
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempt() {
        let policy = RetryPolicy::exponential();
        assert!(policy.delay_for_attempt(2) >= policy.delay_for_attempt(1));
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let policy = RetryPolicy::exponential();
        assert!(policy.has_attempts_remaining(1));
        assert!(!policy.has_attempts_remaining(3));
    }

    #[test]
    fn only_server_errors_are_retryable() {
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
    }
}

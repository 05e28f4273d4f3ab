//! Bounded blocking retry for clipboard contention
//!
//! The host clipboard can briefly refuse access while another process holds
//! it. Reads and writes both retry a fixed number of times with a short
//! sleep in between; the loop is not cancellable.

use std::thread;
use std::time::Duration;
use tracing::debug;

use super::backend::BackendError;

/// Attempt count and backoff for one clipboard operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt budget is spent. The last error is returned on failure.
    pub fn run<T>(
        &self,
        op_name: &'static str,
        mut op: impl FnMut() -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    debug!(
                        op = op_name,
                        attempt,
                        max_attempts = self.attempts,
                        backoff_ms = self.backoff.as_millis() as u64,
                        "Clipboard busy, retrying"
                    );
                    thread::sleep(self.backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = policy(4).run("test", || {
            calls += 1;
            if calls < 3 {
                Err(BackendError::Busy)
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_gives_up_after_attempt_budget() {
        let mut calls = 0;
        let result: Result<(), _> = policy(4).run("test", || {
            calls += 1;
            Err(BackendError::Busy)
        });
        assert_eq!(result, Err(BackendError::Busy));
        assert_eq!(calls, 4, "exactly the configured number of attempts");
    }

    #[test]
    fn test_non_transient_error_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = policy(4).run("test", || {
            calls += 1;
            Err(BackendError::Other("gone".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = policy(0).run("test", || {
            calls += 1;
            Err::<(), _>(BackendError::Busy)
        });
        assert_eq!(calls, 1);
    }
}

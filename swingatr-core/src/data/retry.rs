//! Bounded retry with exponential backoff.

use std::time::Duration;
use tracing::warn;

use super::provider::DataError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Sleep before retry number `retry` (1-based): `base * 2^(retry-1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Sleep before retrying after `error`; a server's Retry-After is a floor.
    pub fn delay_after(&self, retry: u32, error: &DataError) -> Duration {
        let backoff = self.delay_for(retry);
        match error {
            DataError::RateLimited { retry_after_secs } => {
                backoff.max(Duration::from_secs(*retry_after_secs))
            }
            _ => backoff,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn run<T>(
        &self,
        symbol: &str,
        mut op: impl FnMut(u32) -> Result<T, DataError>,
    ) -> Result<T, DataError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= attempts => {
                    return Err(DataError::RetriesExhausted {
                        symbol: symbol.to_string(),
                        attempts,
                        last: Box::new(e),
                    })
                }
                Err(e) => {
                    let delay = self.delay_after(attempt, &e);
                    warn!(
                        symbol,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "fetch failed, retrying"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn rate_limit_waits_at_least_retry_after() {
        let policy = RetryPolicy::new(3, Duration::from_millis(500));
        let limited = DataError::RateLimited { retry_after_secs: 7 };
        assert_eq!(policy.delay_after(1, &limited), Duration::from_secs(7));
        let network = DataError::Network("timeout".into());
        assert_eq!(policy.delay_after(2, &network), Duration::from_secs(1));
    }

    #[test]
    fn backoff_wins_over_short_retry_after() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        let limited = DataError::RateLimited { retry_after_secs: 1 };
        assert_eq!(policy.delay_after(3, &limited), Duration::from_secs(8));
    }

    #[test]
    fn recovers_from_transient_failures() {
        let mut calls = 0;
        let result = instant(3).run("SPY", |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(DataError::Network("timeout".into()))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = instant(2).run("SPY", |_| {
            calls += 1;
            Err(DataError::Network("down".into()))
        });
        assert_eq!(calls, 2);
        match result.unwrap_err() {
            DataError::RetriesExhausted {
                symbol,
                attempts,
                last,
            } => {
                assert_eq!(symbol, "SPY");
                assert_eq!(attempts, 2);
                assert!(matches!(*last, DataError::Network(_)));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = instant(5).run("NOPE", |_| {
            calls += 1;
            Err(DataError::SymbolNotFound {
                symbol: "NOPE".into(),
            })
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = instant(0).run("SPY", |_| {
            calls += 1;
            Ok::<_, DataError>(())
        });
        assert_eq!(calls, 1);
    }
}

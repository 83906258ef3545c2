// src/esi/retry.rs — Exponential backoff for transient ESI failures
//
// Retries: error limiting (420), server errors (5xx), timeouts, connection resets.
// Does NOT retry: bad request, auth errors (401, 403), not found.

use std::time::Duration;

use crate::infra::errors::EveApiError;

const INITIAL_DELAY_MS: u64 = 1_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 30_000;
const JITTER_FRACTION: f64 = 0.2;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl RetryConfig {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }

    /// Delay before retry `attempt` (0-indexed). A server-provided wait wins.
    pub fn delay_for_attempt(&self, attempt: u32, server_delay: Option<Duration>) -> Duration {
        if let Some(delay) = server_delay {
            return delay + Duration::from_millis(100);
        }

        let base_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(100.0);

        Duration::from_millis(final_ms as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::with_max_retries(3)
    }
}

pub fn should_retry(error: &EveApiError) -> bool {
    error.is_retriable()
}

/// How long ESI asked us to back off, if it said.
pub fn server_delay(error: &EveApiError) -> Option<Duration> {
    match error {
        EveApiError::ErrorLimited { retry_after_secs } if *retry_after_secs > 0 => {
            Some(Duration::from_secs(*retry_after_secs))
        }
        _ => None,
    }
}

/// Deterministic jitter multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64;
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_retry_classification() {
        assert!(should_retry(&EveApiError::ErrorLimited {
            retry_after_secs: 5
        }));
        assert!(should_retry(&EveApiError::Esi {
            status: 504,
            message: "timeout".into(),
            retriable: true,
        }));
        assert!(!should_retry(&EveApiError::Esi {
            status: 403,
            message: "forbidden".into(),
            retriable: false,
        }));
        assert!(!should_retry(&EveApiError::MissingKeyPair));
    }

    #[test]
    fn test_server_delay_extraction() {
        let err = EveApiError::ErrorLimited {
            retry_after_secs: 12,
        };
        assert_eq!(server_delay(&err), Some(Duration::from_secs(12)));
        assert!(server_delay(&EveApiError::ErrorLimited {
            retry_after_secs: 0
        })
        .is_none());
    }

    #[test]
    fn test_delay_for_attempt_exponential() {
        let cfg = RetryConfig::default();
        let d0 = cfg.delay_for_attempt(0, None);
        let d1 = cfg.delay_for_attempt(1, None);
        let d2 = cfg.delay_for_attempt(2, None);

        // d0 ≈ 1000ms, d1 ≈ 2000ms, d2 ≈ 4000ms
        assert!(d0.as_millis() >= 750 && d0.as_millis() <= 1250);
        assert!(d1.as_millis() >= 1500 && d1.as_millis() <= 2500);
        assert!(d2.as_millis() >= 3000 && d2.as_millis() <= 5000);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let cfg = RetryConfig::default();
        let d = cfg.delay_for_attempt(12, None);
        assert!(d.as_millis() <= 36_000);
    }

    #[test]
    fn test_delay_uses_server_hint() {
        let cfg = RetryConfig::default();
        let d = cfg.delay_for_attempt(0, Some(Duration::from_secs(10)));
        assert_eq!(d.as_millis(), 10_100);
    }

    #[test]
    fn test_deterministic_jitter_range() {
        for attempt in 0..20 {
            let j = deterministic_jitter(attempt, 0.2);
            assert!((0.8..=1.2).contains(&j), "jitter {j} out of range");
        }
        assert_eq!(deterministic_jitter(5, 0.2), deterministic_jitter(5, 0.2));
    }
}

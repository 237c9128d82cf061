//! Retry policy with exponential backoff and jitter for upstream fetches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Delay schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    Fixed {
        delay_ms: u64,
    },
    /// `base * factor^attempt`, capped at `max`, optionally +/- 50% jitter.
    Exponential {
        base_ms: u64,
        factor: f64,
        max_ms: u64,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base_ms: 250,
            factor: 2.0,
            max_ms: 4_000,
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential {
                base_ms,
                factor,
                max_ms,
                jitter,
            } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let millis = (base_ms as f64 * factor.powi(exponent)).min(max_ms as f64);
                let millis = if millis.is_finite() { millis as u64 } else { max_ms };

                if !jitter {
                    return Duration::from_millis(millis);
                }

                let spread = millis / 2;
                let offset = fastrand::u64(0..=spread.saturating_mul(2));
                Duration::from_millis((millis - spread).saturating_add(offset))
            }
        }
    }
}

/// When and how often a failed price-history request is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed {
                delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub const fn has_budget(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_doubles_then_caps() {
        let backoff = Backoff::Exponential {
            base_ms: 100,
            factor: 2.0,
            max_ms: 1_000,
            jitter: false,
        };

        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
        assert_eq!(backoff.delay(60), Duration::from_secs(1));
    }

    #[test]
    fn jitter_stays_within_half_of_delay() {
        let backoff = Backoff::Exponential {
            base_ms: 200,
            factor: 2.0,
            max_ms: 10_000,
            jitter: true,
        };

        for _ in 0..20 {
            let delay = backoff.delay(1).as_millis();
            assert!((200..=600).contains(&delay), "delay_ms={delay}");
        }
    }

    #[test]
    fn jitter_near_the_duration_ceiling_does_not_overflow() {
        let backoff = Backoff::Exponential {
            base_ms: u64::MAX / 2,
            factor: 4.0,
            max_ms: u64::MAX,
            jitter: true,
        };

        assert!(backoff.delay(3) >= Duration::from_millis(u64::MAX / 2));
    }

    #[test]
    fn default_policy_retries_throttling_and_server_errors() {
        let policy = RetryPolicy::default();
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(policy.should_retry_status(status), "status={status}");
        }
        assert!(!policy.should_retry_status(501));
        assert!(!policy.should_retry_status(401));
        assert!(policy.has_budget(2));
        assert!(!policy.has_budget(3));
    }

    #[test]
    fn no_retry_has_no_budget() {
        assert!(!RetryPolicy::no_retry().has_budget(0));
        let fixed = RetryPolicy::fixed(Duration::from_millis(5), 1);
        assert_eq!(fixed.delay_for_attempt(7), Duration::from_millis(5));
    }

    #[test]
    fn deserializes_partial_policy() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_retries": 1}"#).expect("valid policy");
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.backoff, Backoff::default());
    }
}

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{RetryPolicy, SourceError, ValidationError};

/// Limits for talking to the price source during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Symbols fetched at the same time.
    pub max_concurrency: usize,
    pub quota_window_ms: u64,
    /// Requests allowed per quota window.
    pub quota_limit: u32,
    pub request_timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            quota_window_ms: 60_000,
            quota_limit: 120,
            request_timeout_ms: 10_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchPolicy {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrency == 0 {
            return Err(ValidationError::ZeroConcurrency);
        }
        Ok(())
    }

    pub const fn quota_window(&self) -> Duration {
        Duration::from_millis(self.quota_window_ms)
    }
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Concurrency gate plus request-rate quota shared by all fetch tasks.
#[derive(Clone)]
pub struct FetchThrottle {
    slots: Arc<Semaphore>,
    limiter: Arc<DirectRateLimiter>,
    max_concurrency: usize,
}

/// Held while one fetch is in flight.
#[derive(Debug)]
pub struct FetchPermit {
    _slot: OwnedSemaphorePermit,
}

impl FetchThrottle {
    pub fn new(max_concurrency: usize, quota_window: Duration, quota_limit: u32) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            slots: Arc::new(Semaphore::new(max_concurrency)),
            limiter: Arc::new(RateLimiter::direct(quota_from_window(
                quota_window,
                quota_limit,
            ))),
            max_concurrency,
        }
    }

    pub fn from_policy(policy: &FetchPolicy) -> Self {
        Self::new(
            policy.max_concurrency,
            policy.quota_window(),
            policy.quota_limit,
        )
    }

    /// Waits for a free slot, then for rate budget.
    pub async fn acquire(&self) -> Result<FetchPermit, SourceError> {
        let slot = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| SourceError::internal("fetch throttle was closed"))?;
        self.limiter.until_ready().await;
        Ok(FetchPermit { _slot: slot })
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit.max(1)).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

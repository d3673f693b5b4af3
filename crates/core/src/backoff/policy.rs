//! Admission backoff policy.

use std::time::Duration;

use crate::client::AdmissionSignal;
use crate::config::BackoffConfig;

use super::DelaySampler;

/// Maps an admission signal to the wait before the next ticket request.
///
/// `attempt` is the 1-based count of consecutive signals received so far.
pub trait BackoffPolicy: Send + Sync {
    fn delay_for(&self, signal: AdmissionSignal, attempt: u32) -> Duration;
}

/// Fixed wait when the queue is full, random jitter when throttled.
///
/// - `Busy` waits `busy_interval` regardless of attempt.
/// - `RateLimited` waits a uniform draw from `[0, rate_limited_max)` so
///   throttled clients do not retry in lockstep.
#[derive(Debug)]
pub struct AdmissionBackoffPolicy {
    busy_interval: Duration,
    rate_limited_max: Duration,
    sampler: DelaySampler,
}

impl AdmissionBackoffPolicy {
    pub fn new(config: &BackoffConfig) -> Self {
        Self::with_sampler(config, DelaySampler::from_os_rng())
    }

    /// Use a specific random source (seeded in tests).
    pub fn with_sampler(config: &BackoffConfig, sampler: DelaySampler) -> Self {
        Self {
            busy_interval: config.busy_interval(),
            rate_limited_max: config.rate_limited_max(),
            sampler,
        }
    }
}

impl BackoffPolicy for AdmissionBackoffPolicy {
    fn delay_for(&self, signal: AdmissionSignal, _attempt: u32) -> Duration {
        match signal {
            AdmissionSignal::Busy => self.busy_interval,
            AdmissionSignal::RateLimited => {
                self.sampler.sample(Duration::ZERO, self.rate_limited_max)
            }
        }
    }
}

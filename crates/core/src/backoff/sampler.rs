//! Uniform random delays.

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws durations uniformly from a half-open range.
///
/// Owns its generator; give each session its own sampler.
#[derive(Debug)]
pub struct DelaySampler {
    rng: Mutex<StdRng>,
}

impl DelaySampler {
    /// Sampler seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sampler (for reproducible runs and tests).
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw a duration in `[min, max)`. Returns `min` when the range is empty.
    pub fn sample(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let low = min.as_micros() as u64;
        let high = max.as_micros() as u64;
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Duration::from_micros(rng.random_range(low..high))
    }
}

impl Default for DelaySampler {
    fn default() -> Self {
        Self::from_os_rng()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_stay_in_range() {
        let sampler = DelaySampler::seeded(7);
        let min = Duration::from_secs(2);
        let max = Duration::from_secs(4);
        for _ in 0..1000 {
            let d = sampler.sample(min, max);
            assert!(d >= min && d < max, "sample out of range: {:?}", d);
        }
    }

    #[test]
    fn test_empty_range_returns_min() {
        let sampler = DelaySampler::seeded(1);
        let d = Duration::from_millis(300);
        assert_eq!(sampler.sample(d, d), d);
        assert_eq!(sampler.sample(Duration::ZERO, Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = DelaySampler::seeded(42);
        let b = DelaySampler::seeded(42);
        for _ in 0..10 {
            assert_eq!(
                a.sample(Duration::ZERO, Duration::from_secs(2)),
                b.sample(Duration::ZERO, Duration::from_secs(2))
            );
        }
    }
}

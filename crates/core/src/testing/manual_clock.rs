//! Virtual clock for testing.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use crate::clock::Clock;

#[derive(Debug)]
struct ClockState {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
}

/// Clock whose time only moves when something sleeps or `advance` is called.
///
/// Every sleep is recorded and returns immediately after moving `now`
/// forward, so waits of minutes run in microseconds.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ClockState>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Start at a fixed instant (2024-01-01T00:00:00Z).
    pub fn new() -> Self {
        Self::starting_at(DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(ClockState {
                now,
                sleeps: Vec::new(),
            }),
        }
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = shift(state.now, duration);
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    /// Sum of all recorded sleeps.
    pub fn slept(&self) -> Duration {
        self.lock().sleeps.iter().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn shift(now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(duration)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.lock();
            state.sleeps.push(duration);
            state.now = shift(state.now, duration);
        }
        tokio::task::yield_now().await;
    }
}

//! Deterministic backoff policy for testing.

use std::sync::Mutex;
use std::time::Duration;

use crate::backoff::BackoffPolicy;
use crate::client::AdmissionSignal;

/// Returns the same delay for every signal and records each call.
#[derive(Debug)]
pub struct FixedBackoff {
    delay: Duration,
    calls: Mutex<Vec<(AdmissionSignal, u32)>>,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(signal, attempt)` pairs passed to `delay_for`, in order.
    pub fn calls(&self) -> Vec<(AdmissionSignal, u32)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl BackoffPolicy for FixedBackoff {
    fn delay_for(&self, signal: AdmissionSignal, attempt: u32) -> Duration {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((signal, attempt));
        self.delay
    }
}

//! Admission backoff: how long to wait after a 503 or 429.

mod policy;
mod sampler;

pub use policy::{AdmissionBackoffPolicy, BackoffPolicy};
pub use sampler::DelaySampler;

//! One simulated visitor.
//!
//! A `VirtualUserSession` repeats the visit a browser makes to a
//! queue-protected site: load the static documents, wait in line for a
//! ticket, present the admission token, then pause before the next visit.

mod runner;
mod types;

pub use runner::VirtualUserSession;
pub use types::{IterationReport, SessionError};

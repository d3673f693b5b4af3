//! Ticket lifecycle for one visit.
//!
//! Drives a ticket through `Requesting -> Queued -> Processed`:
//! - **Requesting**: admission signals (503/429) are absorbed and retried
//!   after a backoff; transport failures end the lifecycle.
//! - **Queued**: wait until the check-in is due, then check in. Any check-in
//!   failure ends the lifecycle immediately, with no retry.
//! - **Processed**: terminal; the ticket carries the admission token.

mod machine;
mod types;

pub use machine::TicketStateMachine;
pub use types::{
    Admission, LifecycleError, LifecycleOptions, TicketPhase, DEFAULT_MISSING_CHECK_IN_WAIT,
};

//! Types for the ticket lifecycle.

use std::time::Duration;

use thiserror::Error;

use crate::client::{AdmissionSignal, TicketClientError};
use crate::config::{BackoffConfig, SessionConfig};
use crate::ticket::Ticket;

/// Where a ticket is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketPhase {
    /// No ticket yet. `attempts` counts admission signals received so far.
    Requesting { attempts: u32 },
    /// Holding a queued ticket; the next step is a check-in.
    Queued { ticket: Ticket },
    /// Admitted (terminal).
    Processed { ticket: Ticket },
}

impl TicketPhase {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TicketPhase::Processed { .. })
    }

    /// Returns the phase name (for logging).
    pub fn state_type(&self) -> &'static str {
        match self {
            TicketPhase::Requesting { .. } => "requesting",
            TicketPhase::Queued { .. } => "queued",
            TicketPhase::Processed { .. } => "processed",
        }
    }

    /// Phase a freshly received ticket belongs in.
    pub fn for_ticket(ticket: Ticket) -> Self {
        if ticket.is_processed() {
            TicketPhase::Processed { ticket }
        } else {
            TicketPhase::Queued { ticket }
        }
    }
}

/// Errors that end a ticket lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The initial ticket request failed outright (not an admission signal).
    #[error("ticket request failed: {0}")]
    Request(#[source] TicketClientError),

    /// An admission signal arrived while poll-stage backoff is disabled.
    #[error("ticket request answered with {signal} and poll-stage backoff is disabled")]
    AdmissionRejected { signal: AdmissionSignal },

    /// The configured admission retry ceiling was reached.
    #[error("gave up after {attempts} consecutive admission signals")]
    AdmissionExhausted { attempts: u32 },

    /// A check-in failed. Never retried.
    #[error("ticket check-in failed: {0}")]
    RefreshFailed(#[source] TicketClientError),
}

/// Knobs for the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOptions {
    /// Retry the ticket request on 503/429 (otherwise they are fatal).
    pub poll_backoff: bool,
    /// Stop after this many consecutive admission signals (None = never).
    pub max_admission_attempts: Option<u32>,
    /// Wait before checking in with a queued ticket that carries no
    /// check-in time. Keeps such tickets from being polled in a tight loop.
    pub missing_check_in_wait: Duration,
}

/// Default wait for queued tickets without a check-in time.
pub const DEFAULT_MISSING_CHECK_IN_WAIT: Duration = Duration::from_secs(1);

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            poll_backoff: true,
            max_admission_attempts: None,
            missing_check_in_wait: DEFAULT_MISSING_CHECK_IN_WAIT,
        }
    }
}

impl LifecycleOptions {
    pub fn from_config(session: &SessionConfig, backoff: &BackoffConfig) -> Self {
        Self {
            poll_backoff: session.poll_backoff,
            max_admission_attempts: backoff.max_admission_attempts,
            ..Self::default()
        }
    }
}

/// Outcome of a completed lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// The processed ticket; its token is ready for redemption.
    pub ticket: Ticket,
    /// Admission signals absorbed before a ticket was issued.
    pub admission_attempts: u32,
    /// Check-ins made while queued.
    pub check_ins: u32,
}

impl Admission {
    /// Admission token of the processed ticket.
    pub fn token(&self) -> &str {
        self.ticket.token().unwrap_or_default()
    }
}

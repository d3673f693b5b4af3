//! Types for virtual user sessions.

use std::time::Duration;

use thiserror::Error;

use crate::client::TicketClientError;
use crate::lifecycle::LifecycleError;

/// Errors that fail an iteration.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A static document could not be fetched at all (non-2xx is not an error).
    #[error("asset fetch failed for {path}: {source}")]
    Asset {
        path: String,
        #[source]
        source: TicketClientError,
    },

    /// The ticket lifecycle ended without admission.
    #[error(transparent)]
    Ticket(#[from] LifecycleError),

    /// The protected path could not be fetched with the admission token.
    #[error("redemption failed: {0}")]
    Redeem(#[source] TicketClientError),
}

impl SessionError {
    /// Short category name (for logging).
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Asset { .. } => "asset",
            SessionError::Ticket(LifecycleError::Request(_)) => "ticket_request",
            SessionError::Ticket(LifecycleError::AdmissionRejected { .. }) => "admission_rejected",
            SessionError::Ticket(LifecycleError::AdmissionExhausted { .. }) => {
                "admission_exhausted"
            }
            SessionError::Ticket(LifecycleError::RefreshFailed(_)) => "refresh",
            SessionError::Redeem(_) => "redeem",
        }
    }
}

/// Summary of a completed visit.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    pub ticket_id: String,
    /// Admission signals absorbed before the ticket was issued.
    pub admission_attempts: u32,
    /// Check-ins made while queued.
    pub check_ins: u32,
    /// Status code of the redemption fetch (any status counts as success).
    pub redeem_status: u16,
    /// Whether the ticket was released after processing.
    pub released: bool,
    /// Pause taken after redemption.
    pub think_time: Duration,
}

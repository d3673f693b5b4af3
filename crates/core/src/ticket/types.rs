//! Core ticket data types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Admission state of a ticket.
///
/// Only moves forward: a ticket that has been processed never goes back
/// to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TicketStatus {
    /// Waiting in line; the holder must check in on schedule.
    Queued,
    /// Admitted; the ticket carries a token for the protected site.
    Processed,
}

impl TicketStatus {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Queued => "Queued",
            TicketStatus::Processed => "Processed",
        }
    }

    /// Parse the wire representation. Other server statuses
    /// (`NotFound`, `TooBusy`, `TooEarly`) are not valid ticket states.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Queued" => Some(TicketStatus::Queued),
            "Processed" => Some(TicketStatus::Processed),
            _ => None,
        }
    }
}

/// One version of a queue ticket.
///
/// Every check-in returns a new version (new nonce, new check-in time);
/// the previous version is discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    /// Opaque ticket identifier.
    pub id: String,
    /// Rotates on every check-in; must be echoed back on the next one.
    pub nonce: String,
    /// Room the ticket was issued for.
    pub room: String,
    pub status: TicketStatus,
    /// Admission token. Present if and only if `status` is `Processed`.
    pub token: Option<String>,
    /// When the next check-in is due.
    pub check_in_after: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub token_expires: Option<DateTime<Utc>>,
    /// Position in line as reported by the server.
    pub queue_position: Option<u64>,
}

impl Ticket {
    /// Returns true once the ticket has been admitted.
    pub fn is_processed(&self) -> bool {
        self.status == TicketStatus::Processed
    }

    /// Admission token, if processed.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Body for the check-in and release calls.
    pub fn check_in_request(&self) -> CheckInRequest {
        CheckInRequest {
            id: self.id.clone(),
            nonce: self.nonce.clone(),
            room: self.room.clone(),
        }
    }

    /// Time left until the check-in is due, measured from `now`.
    ///
    /// Never negative: an elapsed or missing check-in time yields zero.
    pub fn wait_until_check_in(&self, now: DateTime<Utc>) -> Duration {
        self.check_in_after
            .and_then(|due| (due - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }
}

/// Identifies a ticket version to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckInRequest {
    pub id: String,
    pub nonce: String,
    pub room: String,
}

//! Types for waiting room client operations.

use async_trait::async_trait;
use thiserror::Error;

use crate::ticket::Ticket;

/// Errors that can occur while talking to the waiting room or the site.
#[derive(Debug, Error)]
pub enum TicketClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Unexpected HTTP {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Check-in rejected with HTTP {status}: {detail}")]
    RefreshRejected { status: u16, detail: String },

    #[error("Invalid ticket: {0}")]
    InvalidTicket(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Admission-control signal returned instead of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionSignal {
    /// HTTP 503: the queue is at capacity.
    Busy,
    /// HTTP 429: this client is being throttled.
    RateLimited,
}

impl AdmissionSignal {
    /// Classify a ticket request status code.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            503 => Some(AdmissionSignal::Busy),
            429 => Some(AdmissionSignal::RateLimited),
            _ => None,
        }
    }

    /// Returns the string representation for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdmissionSignal::Busy => "busy",
            AdmissionSignal::RateLimited => "rate_limited",
        }
    }
}

impl std::fmt::Display for AdmissionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a ticket request: either a ticket or a signal to back off.
#[derive(Debug, Clone, PartialEq)]
pub enum TicketResponse {
    Issued(Ticket),
    Signal(AdmissionSignal),
}

/// Queue protocol operations.
#[async_trait]
pub trait TicketClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Join the queue for `room`.
    ///
    /// 503 and 429 come back as `TicketResponse::Signal`; any other
    /// non-success status is an error.
    async fn request_ticket(&self, room: &str) -> Result<TicketResponse, TicketClientError>;

    /// Check in with the current ticket version and get the next one.
    ///
    /// Never yields an admission signal: any non-success status is an error.
    async fn refresh_ticket(&self, ticket: &Ticket) -> Result<Ticket, TicketClientError>;

    /// Give the ticket back so the server can free its slot.
    async fn release_ticket(&self, ticket: &Ticket) -> Result<(), TicketClientError>;
}

/// Plain page fetches against the protected site.
#[async_trait]
pub trait SiteClient: Send + Sync {
    /// GET a static document. Returns the status code; the body is discarded.
    async fn fetch_asset(&self, path: &str) -> Result<u16, TicketClientError>;

    /// GET the protected path presenting the admission token as a cookie.
    async fn redeem(
        &self,
        path: &str,
        cookie_name: &str,
        token: &str,
    ) -> Result<u16, TicketClientError>;
}

//! Waiting room ticket model.

mod types;

pub use types::{CheckInRequest, Ticket, TicketStatus};

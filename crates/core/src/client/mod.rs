//! Waiting room client abstraction.
//!
//! `TicketClient` covers the queue protocol (request, check-in, release);
//! `SiteClient` covers the plain page fetches a visitor makes around it.
//! `HttpWaitingRoomClient` implements both over reqwest.

mod http;
mod types;

pub use http::HttpWaitingRoomClient;
pub use types::*;

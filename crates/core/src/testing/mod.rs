//! Testing utilities and mock implementations.
//!
//! Mocks for the waiting room and site traits plus a virtual clock, so a
//! whole ticket lifecycle can run without a server and without real waits.
//!
//! # Example
//!
//! ```rust,ignore
//! use waitroom_core::testing::{fixtures, ManualClock, MockTicketClient};
//!
//! let client = MockTicketClient::new();
//! client.queue_signal(AdmissionSignal::Busy).await;
//! client.queue_ticket(fixtures::processed_ticket("t-1", "TOKEN")).await;
//!
//! let clock = ManualClock::new();
//! // Run a TicketStateMachine, then inspect clock.sleeps()...
//! ```

mod fixed_backoff;
mod manual_clock;
mod mock_site_client;
mod mock_ticket_client;

pub use fixed_backoff::FixedBackoff;
pub use manual_clock::ManualClock;
pub use mock_site_client::{MockSiteClient, RecordedSiteRequest};
pub use mock_ticket_client::{MockTicketClient, RecordedTicketCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::config::{
        BackoffConfig, Config, SessionConfig, SwarmConfig, TargetConfig, TimingConfig,
    };
    use crate::ticket::{Ticket, TicketStatus};

    /// A queued ticket due for check-in at `check_in_after`.
    pub fn queued_ticket(id: &str, nonce: &str, check_in_after: DateTime<Utc>) -> Ticket {
        Ticket {
            id: id.to_string(),
            nonce: nonce.to_string(),
            room: "main".to_string(),
            status: TicketStatus::Queued,
            token: None,
            check_in_after: Some(check_in_after),
            created_at: None,
            token_expires: None,
            queue_position: Some(1),
        }
    }

    /// A processed ticket carrying `token`.
    pub fn processed_ticket(id: &str, token: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            nonce: format!("{}-final", id),
            room: "main".to_string(),
            status: TicketStatus::Processed,
            token: Some(token.to_string()),
            check_in_after: None,
            created_at: None,
            token_expires: None,
            queue_position: Some(0),
        }
    }

    /// Session settings pointing at relative endpoints.
    pub fn session_config() -> SessionConfig {
        SessionConfig {
            room: "main".to_string(),
            cookie_name: "WAITING_ROOM".to_string(),
            poll_url: "/Ticket".to_string(),
            refresh_url: "/Ticket/check-in".to_string(),
            redirect_path: "/app".to_string(),
            assets: vec!["/".to_string(), "/main.css".to_string(), "/main.js".to_string()],
            poll_backoff: true,
            release_on_processed: false,
        }
    }

    /// Full config against `host` with millisecond timings.
    pub fn fast_config(host: &str) -> Config {
        Config {
            target: TargetConfig {
                host: host.to_string(),
                timeout_secs: 5,
            },
            session: session_config(),
            backoff: BackoffConfig {
                busy_interval_ms: 10,
                rate_limited_max_ms: 5,
                max_admission_attempts: None,
            },
            timing: TimingConfig {
                think_time_min_ms: 1,
                think_time_max_ms: 2,
                failure_cooldown_ms: 1,
            },
            swarm: SwarmConfig {
                users: 1,
                spawn_interval_ms: 0,
                iterations: Some(1),
            },
        }
    }
}

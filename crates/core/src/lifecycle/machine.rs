//! Ticket state machine implementation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::client::{TicketClient, TicketResponse};
use crate::clock::Clock;
use crate::ticket::Ticket;

use super::types::{Admission, LifecycleError, LifecycleOptions, TicketPhase};

/// Drives one ticket from request to admission.
///
/// Keeps no ticket between runs, so one instance serves every visit of a
/// session.
pub struct TicketStateMachine {
    client: Arc<dyn TicketClient>,
    backoff: Arc<dyn BackoffPolicy>,
    clock: Arc<dyn Clock>,
    options: LifecycleOptions,
}

impl TicketStateMachine {
    pub fn new(
        client: Arc<dyn TicketClient>,
        backoff: Arc<dyn BackoffPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            backoff,
            clock,
            options: LifecycleOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Run the lifecycle for `room` until the ticket is processed.
    pub async fn run(&self, room: &str) -> Result<Admission, LifecycleError> {
        let mut phase = TicketPhase::Requesting { attempts: 0 };
        let mut admission_attempts = 0;
        let mut check_ins = 0;

        loop {
            phase = match phase {
                TicketPhase::Requesting { attempts } => {
                    admission_attempts = attempts;
                    self.request(room, attempts).await?
                }
                TicketPhase::Queued { ticket } => {
                    check_ins += 1;
                    self.check_in(&ticket, check_ins).await?
                }
                TicketPhase::Processed { ticket } => {
                    info!(
                        ticket_id = %ticket.id,
                        admission_attempts,
                        check_ins,
                        "Ticket processed"
                    );
                    return Ok(Admission {
                        ticket,
                        admission_attempts,
                        check_ins,
                    });
                }
            };
        }
    }

    /// `Requesting` step: ask for a ticket, backing off on admission signals.
    async fn request(&self, room: &str, attempts: u32) -> Result<TicketPhase, LifecycleError> {
        let response = self
            .client
            .request_ticket(room)
            .await
            .map_err(LifecycleError::Request)?;

        match response {
            TicketResponse::Issued(ticket) => {
                debug!(
                    backend = self.client.name(),
                    ticket_id = %ticket.id,
                    status = ticket.status.as_str(),
                    queue_position = ?ticket.queue_position,
                    "Ticket issued"
                );
                Ok(TicketPhase::for_ticket(ticket))
            }
            TicketResponse::Signal(signal) => {
                if !self.options.poll_backoff {
                    return Err(LifecycleError::AdmissionRejected { signal });
                }

                let attempts = attempts + 1;
                if let Some(max) = self.options.max_admission_attempts {
                    if attempts >= max {
                        return Err(LifecycleError::AdmissionExhausted { attempts });
                    }
                }

                let wait = self.backoff.delay_for(signal, attempts);
                warn!(
                    room,
                    %signal,
                    attempt = attempts,
                    wait_ms = wait.as_millis() as u64,
                    "Admission refused, backing off"
                );
                self.clock.sleep(wait).await;
                Ok(TicketPhase::Requesting { attempts })
            }
        }
    }

    /// `Queued` step: wait for the check-in time, then check in once.
    async fn check_in(&self, ticket: &Ticket, check_in: u32) -> Result<TicketPhase, LifecycleError> {
        let wait = match ticket.check_in_after {
            Some(_) => ticket.wait_until_check_in(self.clock.now()),
            None => {
                warn!(
                    ticket_id = %ticket.id,
                    wait_ms = self.options.missing_check_in_wait.as_millis() as u64,
                    "Queued ticket has no check-in time, using fallback wait"
                );
                self.options.missing_check_in_wait
            }
        };
        debug!(
            ticket_id = %ticket.id,
            check_in,
            queue_position = ?ticket.queue_position,
            wait_ms = wait.as_millis() as u64,
            "Waiting for check-in"
        );
        self.clock.sleep(wait).await;

        let refreshed = self
            .client
            .refresh_ticket(ticket)
            .await
            .map_err(LifecycleError::RefreshFailed)?;
        Ok(TicketPhase::for_ticket(refreshed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::TimeDelta;

    use crate::client::{AdmissionSignal, TicketClientError};
    use crate::testing::{fixtures, FixedBackoff, ManualClock, MockTicketClient};

    struct Harness {
        client: Arc<MockTicketClient>,
        backoff: Arc<FixedBackoff>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                client: Arc::new(MockTicketClient::new()),
                backoff: Arc::new(FixedBackoff::new(Duration::from_secs(10))),
                clock: Arc::new(ManualClock::new()),
            }
        }

        fn machine(&self, options: LifecycleOptions) -> TicketStateMachine {
            TicketStateMachine::new(
                Arc::clone(&self.client) as Arc<dyn TicketClient>,
                Arc::clone(&self.backoff) as Arc<dyn BackoffPolicy>,
                Arc::clone(&self.clock) as Arc<dyn Clock>,
            )
            .with_options(options)
        }
    }

    #[tokio::test]
    async fn test_direct_processed_skips_check_in() {
        let h = Harness::new();
        h.client
            .queue_ticket(fixtures::processed_ticket("t-1", "TOKEN"))
            .await;

        let admission = h.machine(LifecycleOptions::default()).run("main").await.unwrap();

        assert_eq!(admission.token(), "TOKEN");
        assert_eq!(admission.check_ins, 0);
        assert_eq!(admission.admission_attempts, 0);
        assert_eq!(h.client.refresh_count().await, 0);
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_queued_ticket_checks_in_until_processed() {
        let h = Harness::new();
        let now = h.clock.now();
        h.client
            .queue_ticket(fixtures::queued_ticket("t-1", "n-1", now + TimeDelta::seconds(5)))
            .await;
        h.client
            .queue_refresh(fixtures::queued_ticket("t-1", "n-2", now + TimeDelta::seconds(12)))
            .await;
        h.client
            .queue_refresh(fixtures::processed_ticket("t-1", "TOKEN"))
            .await;

        let admission = h.machine(LifecycleOptions::default()).run("main").await.unwrap();

        assert_eq!(admission.check_ins, 2);
        assert_eq!(
            h.clock.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(7)]
        );

        let refreshes = h.client.refresh_requests().await;
        assert_eq!(refreshes.len(), 2);
        assert_eq!(refreshes[0].nonce, "n-1");
        assert_eq!(refreshes[1].nonce, "n-2");
    }

    #[tokio::test]
    async fn test_elapsed_check_in_does_not_sleep() {
        let h = Harness::new();
        let past = h.clock.now() - TimeDelta::seconds(30);
        h.client
            .queue_ticket(fixtures::queued_ticket("t-1", "n-1", past))
            .await;
        h.client
            .queue_refresh(fixtures::processed_ticket("t-1", "TOKEN"))
            .await;

        h.machine(LifecycleOptions::default()).run("main").await.unwrap();

        assert_eq!(h.clock.sleeps(), vec![Duration::ZERO]);
    }

    #[tokio::test]
    async fn test_missing_check_in_time_uses_fallback_wait() {
        let h = Harness::new();
        let mut ticket = fixtures::queued_ticket("t-1", "n-1", h.clock.now());
        ticket.check_in_after = None;
        let mut next = fixtures::queued_ticket("t-1", "n-2", h.clock.now());
        next.check_in_after = None;
        h.client.queue_ticket(ticket).await;
        h.client.queue_refresh(next).await;
        h.client
            .queue_refresh(fixtures::processed_ticket("t-1", "TOKEN"))
            .await;

        let options = LifecycleOptions {
            missing_check_in_wait: Duration::from_millis(750),
            ..Default::default()
        };
        let admission = h.machine(options).run("main").await.unwrap();

        assert_eq!(admission.check_ins, 2);
        assert_eq!(
            h.clock.sleeps(),
            vec![Duration::from_millis(750), Duration::from_millis(750)]
        );
    }

    #[tokio::test]
    async fn test_admission_signals_are_retried_with_counter() {
        let h = Harness::new();
        h.client.queue_signal(AdmissionSignal::Busy).await;
        h.client.queue_signal(AdmissionSignal::RateLimited).await;
        h.client.queue_signal(AdmissionSignal::Busy).await;
        h.client
            .queue_ticket(fixtures::processed_ticket("t-1", "TOKEN"))
            .await;

        let admission = h.machine(LifecycleOptions::default()).run("main").await.unwrap();

        assert_eq!(admission.admission_attempts, 3);
        assert_eq!(h.client.request_count().await, 4);
        assert_eq!(
            h.backoff.calls(),
            vec![
                (AdmissionSignal::Busy, 1),
                (AdmissionSignal::RateLimited, 2),
                (AdmissionSignal::Busy, 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_is_not_retried() {
        let h = Harness::new();
        let now = h.clock.now();
        h.client
            .queue_ticket(fixtures::queued_ticket("t-1", "n-1", now + TimeDelta::seconds(1)))
            .await;
        h.client
            .queue_refresh_error(TicketClientError::RefreshRejected {
                status: 500,
                detail: "Internal Server Error".to_string(),
            })
            .await;
        // Would succeed if a second check-in were attempted.
        h.client
            .queue_refresh(fixtures::processed_ticket("t-1", "TOKEN"))
            .await;

        let err = h
            .machine(LifecycleOptions::default())
            .run("main")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::RefreshFailed(TicketClientError::RefreshRejected { status: 500, .. })
        ));
        assert_eq!(h.client.refresh_count().await, 1);
    }

    #[tokio::test]
    async fn test_request_transport_failure_is_not_retried() {
        let h = Harness::new();
        h.client
            .queue_request_error(TicketClientError::UnexpectedStatus {
                status: 500,
                url: "http://localhost/Ticket".to_string(),
            })
            .await;

        let err = h
            .machine(LifecycleOptions::default())
            .run("main")
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::Request(_)));
        assert_eq!(h.client.request_count().await, 1);
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_signal_is_fatal_without_poll_backoff() {
        let h = Harness::new();
        h.client.queue_signal(AdmissionSignal::Busy).await;

        let options = LifecycleOptions {
            poll_backoff: false,
            ..Default::default()
        };
        let err = h.machine(options).run("main").await.unwrap_err();

        assert!(matches!(
            err,
            LifecycleError::AdmissionRejected {
                signal: AdmissionSignal::Busy
            }
        ));
        assert!(h.clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_retry_ceiling() {
        let h = Harness::new();
        for _ in 0..5 {
            h.client.queue_signal(AdmissionSignal::Busy).await;
        }

        let options = LifecycleOptions {
            max_admission_attempts: Some(3),
            ..Default::default()
        };
        let err = h.machine(options).run("main").await.unwrap_err();

        assert!(matches!(err, LifecycleError::AdmissionExhausted { attempts: 3 }));
        assert_eq!(h.client.request_count().await, 3);
        assert_eq!(h.clock.sleeps().len(), 2);
    }
}

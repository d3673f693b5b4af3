//! Virtual user session implementation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backoff::{AdmissionBackoffPolicy, BackoffPolicy, DelaySampler};
use crate::client::{HttpWaitingRoomClient, SiteClient, TicketClient, TicketClientError};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, SessionConfig, TimingConfig};
use crate::lifecycle::{Admission, LifecycleOptions, TicketStateMachine};

use super::types::{IterationReport, SessionError};

/// One simulated visitor.
///
/// Owns its state machine, clients and random source; only the
/// `SessionConfig` is shared with other sessions.
pub struct VirtualUserSession {
    label: String,
    config: Arc<SessionConfig>,
    timing: TimingConfig,
    site: Arc<dyn SiteClient>,
    tickets: Arc<dyn TicketClient>,
    machine: TicketStateMachine,
    clock: Arc<dyn Clock>,
    think_sampler: DelaySampler,
}

impl VirtualUserSession {
    /// Create a session with default timings and no retry ceiling.
    pub fn new(
        label: impl Into<String>,
        config: Arc<SessionConfig>,
        site: Arc<dyn SiteClient>,
        tickets: Arc<dyn TicketClient>,
        backoff: Arc<dyn BackoffPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let options = LifecycleOptions {
            poll_backoff: config.poll_backoff,
            ..LifecycleOptions::default()
        };
        let machine = TicketStateMachine::new(Arc::clone(&tickets), backoff, Arc::clone(&clock))
            .with_options(options);

        Self {
            label: label.into(),
            config,
            timing: TimingConfig::default(),
            site,
            tickets,
            machine,
            clock,
            think_sampler: DelaySampler::from_os_rng(),
        }
    }

    /// Build a session that talks HTTP to the configured target.
    ///
    /// `shared` is the run-wide session settings; `config` supplies the
    /// target, backoff and timing sections.
    pub fn from_config(
        label: impl Into<String>,
        config: &Config,
        shared: Arc<SessionConfig>,
    ) -> Result<Self, TicketClientError> {
        let http = Arc::new(HttpWaitingRoomClient::new(&config.target, &shared)?);
        let backoff = Arc::new(AdmissionBackoffPolicy::new(&config.backoff));

        Ok(Self::new(
            label,
            shared,
            Arc::clone(&http) as Arc<dyn SiteClient>,
            http as Arc<dyn TicketClient>,
            backoff,
            Arc::new(SystemClock),
        )
        .with_timing(config.timing.clone())
        .with_max_admission_attempts(config.backoff.max_admission_attempts))
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_max_admission_attempts(mut self, max: Option<u32>) -> Self {
        let options = LifecycleOptions {
            max_admission_attempts: max,
            ..*self.machine.options()
        };
        self.machine = self.machine.with_options(options);
        self
    }

    /// Use a specific random source for think-time (seeded in tests).
    pub fn with_think_sampler(mut self, sampler: DelaySampler) -> Self {
        self.think_sampler = sampler;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run one visit.
    ///
    /// On failure the session sleeps the failure cool-down before
    /// returning the error; a successful visit ends with the think-time
    /// pause.
    pub async fn run_iteration(&self) -> Result<IterationReport, SessionError> {
        match self.visit().await {
            Ok((admission, redeem_status, released)) => {
                let think_time = self
                    .think_sampler
                    .sample(self.timing.think_time_min(), self.timing.think_time_max());
                info!(
                    session = %self.label,
                    ticket_id = %admission.ticket.id,
                    redeem_status,
                    think_ms = think_time.as_millis() as u64,
                    "Visit completed"
                );
                self.clock.sleep(think_time).await;

                Ok(IterationReport {
                    ticket_id: admission.ticket.id,
                    admission_attempts: admission.admission_attempts,
                    check_ins: admission.check_ins,
                    redeem_status,
                    released,
                    think_time,
                })
            }
            Err(e) => {
                let cooldown = self.timing.failure_cooldown();
                warn!(
                    session = %self.label,
                    kind = e.kind(),
                    error = %e,
                    cooldown_ms = cooldown.as_millis() as u64,
                    "Visit failed"
                );
                self.clock.sleep(cooldown).await;
                Err(e)
            }
        }
    }

    /// Assets, ticket, optional release, redemption.
    async fn visit(&self) -> Result<(Admission, u16, bool), SessionError> {
        self.fetch_assets().await?;

        let admission = self.machine.run(&self.config.room).await?;

        let released = self.config.release_on_processed && self.release(&admission).await;

        let redeem_status = self
            .site
            .redeem(
                &self.config.redirect_path,
                &self.config.cookie_name,
                admission.token(),
            )
            .await
            .map_err(SessionError::Redeem)?;

        Ok((admission, redeem_status, released))
    }

    async fn fetch_assets(&self) -> Result<(), SessionError> {
        for path in &self.config.assets {
            let status = self
                .site
                .fetch_asset(path)
                .await
                .map_err(|source| SessionError::Asset {
                    path: path.clone(),
                    source,
                })?;
            debug!(session = %self.label, path = %path, status, "Fetched asset");
        }
        Ok(())
    }

    /// Best effort: a failed release is logged and the visit continues.
    async fn release(&self, admission: &Admission) -> bool {
        match self.tickets.release_ticket(&admission.ticket).await {
            Ok(()) => {
                debug!(session = %self.label, ticket_id = %admission.ticket.id, "Ticket released");
                true
            }
            Err(e) => {
                warn!(
                    session = %self.label,
                    ticket_id = %admission.ticket.id,
                    error = %e,
                    "Failed to release ticket"
                );
                false
            }
        }
    }

    /// Failure cool-down currently in effect.
    pub fn failure_cooldown(&self) -> Duration {
        self.timing.failure_cooldown()
    }
}

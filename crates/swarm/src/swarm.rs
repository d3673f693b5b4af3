//! Spawns and drives the virtual users of a run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, error, info};

use waitroom_core::{Config, SessionConfig, VirtualUserSession};

/// Iterations one user finished before stopping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserOutcome {
    pub completed: u64,
    pub failed: u64,
}

impl UserOutcome {
    fn total(&self) -> u64 {
        self.completed + self.failed
    }
}

/// Latched stop flag shared by the ramp loop and every user.
///
/// Once triggered it stays set, so users spawned afterwards see it too.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self(Arc::new(tx))
    }

    pub fn trigger(&self) {
        self.0.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.0.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.0.subscribe()
    }
}

/// Resolves once the flag is set. A closed channel counts as stopped.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// A run of `users` independent sessions against one waiting room.
pub struct Swarm {
    config: Config,
    /// Session settings every user reads; never mutated after start.
    shared: Arc<SessionConfig>,
    shutdown: ShutdownHandle,
}

impl Swarm {
    pub fn new(config: Config) -> Self {
        let shared = Arc::new(config.session.clone());

        Self {
            config,
            shared,
            shutdown: ShutdownHandle::new(),
        }
    }

    /// Handle that stops the ramp and every user at its next suspension point.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Spawn the users, staggered by the spawn interval, and wait for all
    /// of them to stop.
    pub async fn run(&self) -> Result<Vec<UserOutcome>> {
        let users = self.config.swarm.users;
        let spawn_interval = Duration::from_millis(self.config.swarm.spawn_interval_ms);
        let iterations = self.config.swarm.iterations;
        let mut shutdown_rx = self.shutdown.subscribe();

        info!("Starting {} virtual users", users);

        let mut handles = Vec::with_capacity(users);
        for index in 0..users {
            let stop = *shutdown_rx.borrow_and_update();
            if stop {
                info!("Shutdown during ramp-up, {} of {} users started", index, users);
                break;
            }

            if index > 0 && !spawn_interval.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(spawn_interval) => {}
                    _ = stopped(&mut shutdown_rx) => {
                        info!("Shutdown during ramp-up, {} of {} users started", index, users);
                        break;
                    }
                }
            }

            let session = match VirtualUserSession::from_config(
                format!("user-{}", index),
                &self.config,
                Arc::clone(&self.shared),
            ) {
                Ok(session) => session,
                Err(e) => {
                    // Stop the users already running before bailing out.
                    self.shutdown.trigger();
                    join_all(handles).await;
                    return Err(e).with_context(|| format!("Failed to create session user-{}", index));
                }
            };

            let rx = self.shutdown.subscribe();
            handles.push(tokio::spawn(run_user(session, iterations, rx)));

            if spawn_interval.is_zero() {
                // Let the signal task run between back-to-back spawns.
                tokio::task::yield_now().await;
            }
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for result in join_all(handles).await {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("User task panicked: {}", e),
            }
        }
        Ok(outcomes)
    }
}

/// Loop visits until the iteration budget is spent or shutdown arrives.
///
/// An in-flight visit is dropped at its next await when shutdown fires.
pub async fn run_user(
    session: VirtualUserSession,
    iterations: Option<u64>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> UserOutcome {
    let mut outcome = UserOutcome::default();

    loop {
        if iterations.is_some_and(|max| outcome.total() >= max) {
            break;
        }
        if *shutdown_rx.borrow() {
            debug!(session = session.label(), "Shutdown received");
            break;
        }

        tokio::select! {
            _ = stopped(&mut shutdown_rx) => {
                debug!(session = session.label(), "Shutdown received");
                break;
            }
            result = session.run_iteration() => match result {
                Ok(report) => {
                    outcome.completed += 1;
                    info!(
                        session = session.label(),
                        ticket_id = %report.ticket_id,
                        admission_attempts = report.admission_attempts,
                        check_ins = report.check_ins,
                        redeem_status = report.redeem_status,
                        "Iteration completed"
                    );
                }
                Err(e) => {
                    outcome.failed += 1;
                    error!(
                        session = session.label(),
                        kind = e.kind(),
                        error = %e,
                        "Iteration failed"
                    );
                }
            }
        }
    }

    info!(
        session = session.label(),
        completed = outcome.completed,
        failed = outcome.failed,
        "User stopped"
    );
    outcome
}

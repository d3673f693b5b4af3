//! Mock waiting room client for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::client::{AdmissionSignal, TicketClient, TicketClientError, TicketResponse};
use crate::clock::Clock;
use crate::ticket::{CheckInRequest, Ticket};

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedTicketCall {
    Request {
        room: String,
        at: DateTime<Utc>,
    },
    Refresh {
        request: CheckInRequest,
        at: DateTime<Utc>,
    },
    Release {
        request: CheckInRequest,
        at: DateTime<Utc>,
    },
}

impl RecordedTicketCall {
    /// When the call was made.
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            RecordedTicketCall::Request { at, .. }
            | RecordedTicketCall::Refresh { at, .. }
            | RecordedTicketCall::Release { at, .. } => *at,
        }
    }
}

/// Scripted implementation of the TicketClient trait.
///
/// Request and refresh outcomes are consumed in the order they were
/// queued. An empty script yields an `ApiError`, so a test that forgets
/// a response fails instead of hanging.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTicketClient::new();
/// client.queue_signal(AdmissionSignal::Busy).await;
/// client.queue_ticket(fixtures::queued_ticket("t-1", "n-1", due)).await;
/// client.queue_refresh(fixtures::processed_ticket("t-1", "TOKEN")).await;
///
/// // ... run the lifecycle ...
///
/// assert_eq!(client.request_count().await, 2);
/// assert_eq!(client.refresh_count().await, 1);
/// ```
pub struct MockTicketClient {
    requests: Arc<RwLock<VecDeque<Result<TicketResponse, TicketClientError>>>>,
    refreshes: Arc<RwLock<VecDeque<Result<Ticket, TicketClientError>>>>,
    calls: Arc<RwLock<Vec<RecordedTicketCall>>>,
    /// If set, the next release fails with this error.
    next_release_error: Arc<RwLock<Option<TicketClientError>>>,
    /// Stamps recorded calls; wall clock when absent.
    clock: Option<Arc<dyn Clock>>,
}

impl Default for MockTicketClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTicketClient {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(VecDeque::new())),
            refreshes: Arc::new(RwLock::new(VecDeque::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_release_error: Arc::new(RwLock::new(None)),
            clock: None,
        }
    }

    /// Stamp recorded calls with `clock` (usually a `ManualClock`).
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock: Some(clock),
            ..Self::new()
        }
    }

    pub async fn queue_ticket(&self, ticket: Ticket) {
        self.requests
            .write()
            .await
            .push_back(Ok(TicketResponse::Issued(ticket)));
    }

    pub async fn queue_signal(&self, signal: AdmissionSignal) {
        self.requests
            .write()
            .await
            .push_back(Ok(TicketResponse::Signal(signal)));
    }

    pub async fn queue_request_error(&self, error: TicketClientError) {
        self.requests.write().await.push_back(Err(error));
    }

    pub async fn queue_refresh(&self, ticket: Ticket) {
        self.refreshes.write().await.push_back(Ok(ticket));
    }

    pub async fn queue_refresh_error(&self, error: TicketClientError) {
        self.refreshes.write().await.push_back(Err(error));
    }

    /// Configure the next release to fail with the given error.
    pub async fn set_next_release_error(&self, error: TicketClientError) {
        *self.next_release_error.write().await = Some(error);
    }

    /// All recorded calls, in order.
    pub async fn calls(&self) -> Vec<RecordedTicketCall> {
        self.calls.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| matches!(c, RecordedTicketCall::Request { .. }))
            .count()
    }

    pub async fn refresh_count(&self) -> usize {
        self.refresh_requests().await.len()
    }

    /// Bodies sent with each check-in, in order.
    pub async fn refresh_requests(&self) -> Vec<CheckInRequest> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedTicketCall::Refresh { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Bodies sent with each release, in order.
    pub async fn release_requests(&self) -> Vec<CheckInRequest> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                RecordedTicketCall::Release { request, .. } => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of scripted outcomes not yet consumed (requests, refreshes).
    pub async fn remaining(&self) -> (usize, usize) {
        (
            self.requests.read().await.len(),
            self.refreshes.read().await.len(),
        )
    }

    fn now(&self) -> DateTime<Utc> {
        match &self.clock {
            Some(clock) => clock.now(),
            None => Utc::now(),
        }
    }

    async fn record(&self, call: RecordedTicketCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl TicketClient for MockTicketClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request_ticket(&self, room: &str) -> Result<TicketResponse, TicketClientError> {
        self.record(RecordedTicketCall::Request {
            room: room.to_string(),
            at: self.now(),
        })
        .await;

        self.requests.write().await.pop_front().unwrap_or_else(|| {
            Err(TicketClientError::ApiError(
                "no scripted ticket response".to_string(),
            ))
        })
    }

    async fn refresh_ticket(&self, ticket: &Ticket) -> Result<Ticket, TicketClientError> {
        self.record(RecordedTicketCall::Refresh {
            request: ticket.check_in_request(),
            at: self.now(),
        })
        .await;

        self.refreshes.write().await.pop_front().unwrap_or_else(|| {
            Err(TicketClientError::ApiError(
                "no scripted check-in response".to_string(),
            ))
        })
    }

    async fn release_ticket(&self, ticket: &Ticket) -> Result<(), TicketClientError> {
        self.record(RecordedTicketCall::Release {
            request: ticket.check_in_request(),
            at: self.now(),
        })
        .await;

        match self.next_release_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

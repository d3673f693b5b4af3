//! reqwest-backed waiting room client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::{SessionConfig, TargetConfig};
use crate::ticket::{Ticket, TicketStatus};

use super::{AdmissionSignal, SiteClient, TicketClient, TicketClientError, TicketResponse};

/// HTTP client for one virtual user.
///
/// Holds its own cookie jar, so each instance behaves like a separate
/// browser. Do not share one instance across sessions.
pub struct HttpWaitingRoomClient {
    client: Client,
    base: Url,
    poll_url: Url,
    refresh_url: Url,
}

impl HttpWaitingRoomClient {
    /// Create a client for the configured target and queue endpoints.
    pub fn new(target: &TargetConfig, session: &SessionConfig) -> Result<Self, TicketClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(target.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TicketClientError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        let base = Url::parse(&target.host)
            .map_err(|e| TicketClientError::InvalidUrl(format!("{}: {}", target.host, e)))?;
        let poll_url = resolve(&base, &session.poll_url)?;
        let refresh_url = resolve(&base, &session.refresh_url)?;

        Ok(Self {
            client,
            base,
            poll_url,
            refresh_url,
        })
    }

    /// Read the body of a successful ticket response.
    async fn read_ticket(response: Response) -> Result<Ticket, TicketClientError> {
        let wire: WireTicket = response.json().await.map_err(|e| {
            TicketClientError::InvalidTicket(format!("Failed to parse response: {}", e))
        })?;
        wire.into_ticket()
    }
}

/// Resolve a configured path against the base URL. Absolute URLs win.
fn resolve(base: &Url, path: &str) -> Result<Url, TicketClientError> {
    base.join(path)
        .map_err(|e| TicketClientError::InvalidUrl(format!("{}: {}", path, e)))
}

fn map_send_error(e: reqwest::Error) -> TicketClientError {
    if e.is_timeout() {
        TicketClientError::Timeout
    } else if e.is_connect() {
        TicketClientError::ConnectionFailed(e.to_string())
    } else {
        TicketClientError::ApiError(e.to_string())
    }
}

/// Ticket as serialized by the waiting room API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTicket {
    id: String,
    #[serde(default)]
    nonce: Option<String>,
    #[serde(default)]
    room: String,
    status: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    check_in_after: Option<f64>,
    #[serde(default)]
    created_time: Option<i64>,
    #[serde(default)]
    token_expires: Option<i64>,
    #[serde(default)]
    queue_position: Option<i64>,
}

impl WireTicket {
    fn into_ticket(self) -> Result<Ticket, TicketClientError> {
        let status = TicketStatus::parse(&self.status).ok_or_else(|| {
            TicketClientError::InvalidTicket(format!(
                "ticket {} has unexpected status '{}'",
                self.id, self.status
            ))
        })?;

        let token = match status {
            TicketStatus::Processed => match self.token {
                Some(token) if !token.is_empty() => Some(token),
                _ => {
                    return Err(TicketClientError::InvalidTicket(format!(
                        "ticket {} is processed but carries no token",
                        self.id
                    )))
                }
            },
            TicketStatus::Queued => None,
        };

        Ok(Ticket {
            id: self.id,
            nonce: self.nonce.unwrap_or_default(),
            room: self.room,
            status,
            token,
            // 0 and absent both map to None; the state machine waits its fallback.
            check_in_after: self.check_in_after.and_then(epoch_secs_to_datetime),
            created_at: self.created_time.and_then(timestamp_to_datetime),
            token_expires: self.token_expires.and_then(timestamp_to_datetime),
            queue_position: self.queue_position.and_then(|p| u64::try_from(p).ok()),
        })
    }
}

/// RFC 7807 body returned for 404 and 412 check-in failures.
#[derive(Debug, Deserialize)]
struct ProblemDetails {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Convert Unix timestamp to DateTime<Utc>.
fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

/// Convert fractional Unix seconds to DateTime<Utc>.
fn epoch_secs_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if secs.is_finite() && secs > 0.0 {
        Utc.timestamp_millis_opt((secs * 1000.0).round() as i64)
            .single()
    } else {
        None
    }
}

/// Human-readable reason for a failed check-in.
async fn rejection_detail(response: Response) -> String {
    let status = response.status();
    let fallback = status
        .canonical_reason()
        .unwrap_or("Unknown status")
        .to_string();

    if status == StatusCode::NOT_FOUND || status == StatusCode::PRECONDITION_FAILED {
        if let Ok(problem) = response.json::<ProblemDetails>().await {
            return problem.detail.or(problem.title).unwrap_or(fallback);
        }
    }
    fallback
}

#[async_trait]
impl TicketClient for HttpWaitingRoomClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn request_ticket(&self, room: &str) -> Result<TicketResponse, TicketClientError> {
        let mut url = self.poll_url.clone();
        url.query_pairs_mut().append_pair("room", room);

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if let Some(signal) = AdmissionSignal::from_status(status.as_u16()) {
            debug!(room, %signal, "Ticket request answered with admission signal");
            return Ok(TicketResponse::Signal(signal));
        }

        if !status.is_success() {
            return Err(TicketClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Self::read_ticket(response).await.map(TicketResponse::Issued)
    }

    async fn refresh_ticket(&self, ticket: &Ticket) -> Result<Ticket, TicketClientError> {
        let response = self
            .client
            .put(self.refresh_url.clone())
            .json(&ticket.check_in_request())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = rejection_detail(response).await;
            return Err(TicketClientError::RefreshRejected {
                status: status.as_u16(),
                detail,
            });
        }

        Self::read_ticket(response).await
    }

    async fn release_ticket(&self, ticket: &Ticket) -> Result<(), TicketClientError> {
        let response = self
            .client
            .delete(self.poll_url.clone())
            .json(&ticket.check_in_request())
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TicketClientError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.poll_url.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SiteClient for HttpWaitingRoomClient {
    async fn fetch_asset(&self, path: &str) -> Result<u16, TicketClientError> {
        let url = resolve(&self.base, path)?;
        let response = self.client.get(url).send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();
        response.bytes().await.map_err(map_send_error)?;
        Ok(status)
    }

    async fn redeem(
        &self,
        path: &str,
        cookie_name: &str,
        token: &str,
    ) -> Result<u16, TicketClientError> {
        let url = resolve(&self.base, path)?;
        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, format!("{}={}", cookie_name, token))
            .send()
            .await
            .map_err(map_send_error)?;
        let status = response.status().as_u16();
        response.bytes().await.map_err(map_send_error)?;
        Ok(status)
    }
}

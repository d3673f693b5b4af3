//! Mock protected site for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::client::{SiteClient, TicketClientError};

/// A recorded site request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedSiteRequest {
    Asset { path: String },
    Redeem {
        path: String,
        cookie_name: String,
        token: String,
    },
}

/// Mock implementation of the SiteClient trait.
///
/// Answers 200 unless a status or error has been configured.
#[derive(Debug)]
pub struct MockSiteClient {
    requests: Arc<RwLock<Vec<RecordedSiteRequest>>>,
    /// Status overrides by path.
    statuses: Arc<RwLock<HashMap<String, u16>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TicketClientError>>>,
}

impl Default for MockSiteClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSiteClient {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(RwLock::new(Vec::new())),
            statuses: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Answer `path` with `status` from now on.
    pub async fn set_status(&self, path: &str, status: u16) {
        self.statuses.write().await.insert(path.to_string(), status);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TicketClientError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn requests(&self) -> Vec<RecordedSiteRequest> {
        self.requests.read().await.clone()
    }

    /// Paths fetched as static assets, in order.
    pub async fn asset_paths(&self) -> Vec<String> {
        self.requests
            .read()
            .await
            .iter()
            .filter_map(|r| match r {
                RecordedSiteRequest::Asset { path } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(path, cookie_name, token)` of each redemption, in order.
    pub async fn redemptions(&self) -> Vec<(String, String, String)> {
        self.requests
            .read()
            .await
            .iter()
            .filter_map(|r| match r {
                RecordedSiteRequest::Redeem {
                    path,
                    cookie_name,
                    token,
                } => Some((path.clone(), cookie_name.clone(), token.clone())),
                _ => None,
            })
            .collect()
    }

    async fn respond(&self, path: &str) -> Result<u16, TicketClientError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.statuses.read().await.get(path).copied().unwrap_or(200))
    }
}

#[async_trait]
impl SiteClient for MockSiteClient {
    async fn fetch_asset(&self, path: &str) -> Result<u16, TicketClientError> {
        self.requests.write().await.push(RecordedSiteRequest::Asset {
            path: path.to_string(),
        });
        self.respond(path).await
    }

    async fn redeem(
        &self,
        path: &str,
        cookie_name: &str,
        token: &str,
    ) -> Result<u16, TicketClientError> {
        self.requests.write().await.push(RecordedSiteRequest::Redeem {
            path: path.to_string(),
            cookie_name: cookie_name.to_string(),
            token: token.to_string(),
        });
        self.respond(path).await
    }
}

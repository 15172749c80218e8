//! REST client for the SkillSync notification endpoints
//!
//! [`NotificationApi`] is the seam between the poller and the network; the
//! HTTP implementation lives here and test fakes implement the same trait.
//! Raw JSON is mapped into the typed model at this boundary, failing closed
//! on missing fields.

use crate::config::ApiConfig;
use crate::errors::{SyncError, SyncResult};
use crate::model::{NotificationId, NotificationItem};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Notification backend operations used by the poller and the CLI.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Number of unread notifications for the current user.
    async fn unread_count(&self) -> SyncResult<u64>;

    /// Most recent notifications, newest first, at most `limit` entries.
    async fn recent(&self, limit: usize) -> SyncResult<Vec<NotificationItem>>;

    /// Mark a single notification read; returns the updated item.
    async fn mark_read(&self, id: &NotificationId) -> SyncResult<NotificationItem>;

    /// Mark every notification read; returns how many were updated.
    async fn mark_all_read(&self) -> SyncResult<u64>;
}

#[derive(Debug, Deserialize)]
struct UnreadCountBody {
    #[serde(default)]
    unread_count: u64,
}

#[derive(Debug, Deserialize)]
struct MarkAllReadBody {
    #[serde(default)]
    updated: u64,
}

/// `reqwest`-backed implementation of [`NotificationApi`].
#[derive(Debug)]
pub struct HttpNotificationApi {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpNotificationApi {
    pub fn new(config: &ApiConfig) -> SyncResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(30));

        // Url::join drops the last path segment unless the base ends in '/'.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| SyncError::InvalidBaseUrl {
            url: config.base_url.clone(),
            source: Some(Box::new(e)),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::config_with_source("failed to create HTTP client", e))?;

        Ok(HttpNotificationApi {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| SyncError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                source: Some(Box::new(e)),
            })
    }

    fn headers(&self) -> SyncResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.auth_token {
            let value = format!("Bearer {token}");
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value)
                    .map_err(|e| SyncError::config_with_source("invalid auth token", e))?,
            );
        }
        Ok(headers)
    }

    async fn check_status(response: reqwest::Response) -> SyncResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(SyncError::HttpStatus {
                status_code: status.as_u16(),
                reason,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn unread_count(&self) -> SyncResult<u64> {
        let url = self.endpoint("notifications/unread-count")?;
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await?;
        let body: UnreadCountBody = Self::check_status(response).await?.json().await?;
        Ok(body.unread_count)
    }

    async fn recent(&self, limit: usize) -> SyncResult<Vec<NotificationItem>> {
        let url = self.endpoint("notifications/recent")?;
        let response = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .headers(self.headers()?)
            .send()
            .await?;
        let raw: Vec<serde_json::Value> = Self::check_status(response).await?.json().await?;

        // Skip malformed entries instead of failing the whole fetch.
        let mut items = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<NotificationItem>(value) {
                Ok(item) => items.push(item),
                Err(e) => debug!("skipping malformed notification entry: {e}"),
            }
        }
        Ok(items)
    }

    async fn mark_read(&self, id: &NotificationId) -> SyncResult<NotificationItem> {
        let url = self.endpoint(&format!("notifications/{id}/read"))?;
        let response = self
            .client
            .patch(url)
            .headers(self.headers()?)
            .send()
            .await?;
        let item: NotificationItem = Self::check_status(response).await?.json().await?;
        Ok(item)
    }

    async fn mark_all_read(&self) -> SyncResult<u64> {
        let url = self.endpoint("notifications/read-all")?;
        let response = self
            .client
            .patch(url)
            .headers(self.headers()?)
            .send()
            .await?;
        let body: MarkAllReadBody = Self::check_status(response).await?.json().await?;
        Ok(body.updated)
    }
}

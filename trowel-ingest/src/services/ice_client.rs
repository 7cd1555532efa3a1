//! ICE history API client
//!
//! `GET {base}/{market}/{resource}/history/{source_id}/?lang=..&limit=..&offset=..`
//!
//! Transport failures are classified into [`PageError`] variants here so the
//! fetcher can decide what to retry without knowing about HTTP.

use crate::catalog::SourceDescriptor;
use crate::error::PageError;
use crate::models::HistoryPage;
use crate::services::fetcher::HistoryClient;
use async_trait::async_trait;
use std::time::Duration;
use trowel_common::config::ApiConfig;
use trowel_common::{Error, Result};

/// Longest response body excerpt kept in an error
const MAX_ERROR_BODY: usize = 200;

pub struct IceApiClient {
    http_client: reqwest::Client,
    base_url: String,
    resource: String,
    locale: String,
    timeout: Duration,
}

impl IceApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            resource: config.resource.trim_matches('/').to_string(),
            locale: config.locale.clone(),
            timeout: config.timeout(),
        })
    }

    /// History endpoint of one source
    pub fn history_url(&self, source: &SourceDescriptor) -> String {
        format!(
            "{}/{}/{}/history/{}/",
            self.base_url, source.category.market_code(), self.resource, source.id
        )
    }

    fn classify(&self, err: reqwest::Error) -> PageError {
        if err.is_timeout() {
            PageError::Timeout(self.timeout)
        } else if err.is_connect() {
            PageError::Connect(err.to_string())
        } else if err.is_decode() {
            PageError::Malformed(err.to_string())
        } else {
            PageError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl HistoryClient for IceApiClient {
    async fn fetch_page(
        &self,
        source: &SourceDescriptor,
        offset: u64,
        limit: u64,
    ) -> std::result::Result<HistoryPage, PageError> {
        let url = self.history_url(source);
        tracing::trace!(%url, offset, limit, "GET history page");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("lang", self.locale.clone()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(PageError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        serde_json::from_slice(&body).map_err(|e| PageError::Malformed(e.to_string()))
    }
}

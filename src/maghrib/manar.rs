use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use super::extract::Extractor;
use super::types::TimeValue;
use crate::config::Config;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("timeout")]
    Timeout,
    #[error("parse_failed")]
    Parse,
}

/// One attempt at reading today's maghrib time from upstream.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<TimeValue, FetchError>;
}

pub struct ManarClient {
    client: Client,
    url: String,
    timeout: Duration,
    extractor: Extractor,
}

impl ManarClient {
    pub fn new(config: &Config) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/html"));

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .pool_max_idle_per_host(0)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url: config.manar_url.clone(),
            timeout: config.fetch_timeout,
            extractor: Extractor::default(),
        }
    }

    async fn fetch_page(&self) -> Result<String, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, url = %self.url, "upstream answered with non-success status");
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl Fetcher for ManarClient {
    async fn fetch(&self) -> Result<TimeValue, FetchError> {
        // Elapsing drops the request future, which tears down the connection.
        let html = tokio::time::timeout(self.timeout, self.fetch_page())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(|e| match e {
                FetchError::Network(err) if err.is_timeout() => FetchError::Timeout,
                other => other,
            })?;

        tracing::debug!(bytes = html.len(), "fetched upstream page");

        self.extractor.extract(&html).ok_or(FetchError::Parse)
    }
}

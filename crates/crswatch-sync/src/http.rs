//! HTTP feed source for the public rounds endpoint.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use serde_json::Value;
use tracing::info;

use crate::{FeedSource, FetchError, RetryPolicy};

/// Public Express Entry rounds feed.
pub const FEED_URL: &str =
    "https://www.canada.ca/content/dam/ircc/documents/json/ee_rounds_123_en.json";

/// The endpoint rejects requests without a browser-like agent.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Fetches the feed with `GET`, retrying per [`RetryPolicy`].
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    user_agent: String,
    policy: RetryPolicy,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            policy,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn fetch_once(&self) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = resp.json().await?;
        Ok(value)
    }
}

#[async_trait]
impl FeedSource for HttpSource {
    async fn fetch(&self) -> Result<Value, FetchError> {
        info!(url = %self.url, "pulling rounds feed");
        let value = self.policy.run(|_| self.fetch_once()).await?;
        info!("feed received");
        Ok(value)
    }

    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }
}

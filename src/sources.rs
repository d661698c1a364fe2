use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::SourcesConfig;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Quote {
    #[serde(rename = "quote")]
    pub text: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Joke {
    #[serde(rename = "value")]
    pub text: String,
}

/// Provides the full quote collection; selection happens locally.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>>;
}

/// Provides one joke per call; the remote side picks it.
#[async_trait]
pub trait JokeSource: Send + Sync {
    async fn fetch_joke(&self) -> Result<Joke>;
}

/// HTTP-backed quote and joke sources sharing one client.
pub struct RemoteSources {
    client: reqwest::Client,
    quotes_url: String,
    jokes_url: String,
}

impl RemoteSources {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for remote sources")?;
        Ok(Self {
            client,
            quotes_url: config.quotes_url.clone(),
            jokes_url: config.jokes_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", url, status, body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[async_trait]
impl QuoteSource for RemoteSources {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>> {
        let quotes: Vec<Quote> = self.get_json(&self.quotes_url).await?;
        if quotes.is_empty() {
            anyhow::bail!("Quote source returned an empty collection");
        }
        Ok(quotes)
    }
}

#[async_trait]
impl JokeSource for RemoteSources {
    async fn fetch_joke(&self) -> Result<Joke> {
        self.get_json(&self.jokes_url).await
    }
}

use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::SearchConfig;
use crate::search::traits::{ArticleProvider, OrganicResult, SearchError};

/// Longest provider error body kept in a `SearchError::Status`
const MAX_ERROR_BODY: usize = 300;

// SerpAPI-compatible web search
pub struct SerpApiProvider {
    client: reqwest::Client,
    base_url: String,
    engine: String,
    api_key: String,
    timeout_ms: u64,
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    #[serde(default)]
    error: Option<String>,
}

impl SerpApiProvider {
    pub fn new(config: &SearchConfig, api_key: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build reqwest client with timeout")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            engine: config.engine.clone(),
            api_key,
            timeout_ms: config.timeout_ms,
        })
    }

    fn map_transport(&self, err: reqwest::Error) -> SearchError {
        if err.is_timeout() {
            SearchError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else if err.is_decode() {
            SearchError::Parse(err.to_string())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ArticleProvider for SerpApiProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<OrganicResult>, SearchError> {
        debug!(
            "Querying {} (engine={}, num={}, chars={})",
            self.base_url,
            self.engine,
            limit,
            query.len()
        );

        let num = limit.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("engine", self.engine.as_str()),
                ("q", query),
                ("api_key", self.api_key.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SearchError::Unauthorized);
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(SearchError::QuotaExceeded),
            s if !s.is_success() => {
                let mut body = response.text().await.unwrap_or_default();
                if body.len() > MAX_ERROR_BODY {
                    let cut = (0..=MAX_ERROR_BODY)
                        .rev()
                        .find(|&i| body.is_char_boundary(i))
                        .unwrap_or(0);
                    body.truncate(cut);
                }
                return Err(SearchError::Status {
                    status: s.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        let parsed: SerpApiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_transport(e)
            } else {
                SearchError::Parse(e.to_string())
            }
        })?;

        if let Some(message) = parsed.error
            && parsed.organic_results.is_empty()
        {
            return Err(SearchError::Provider(message));
        }

        let mut results = parsed.organic_results;
        results.truncate(limit);
        Ok(results)
    }

    fn name(&self) -> &str {
        "serpapi"
    }
}

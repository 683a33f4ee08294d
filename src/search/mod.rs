//! Article search adapter: best-effort enrichment that degrades to "no articles"

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, MAX_ARTICLES, SearchConfig};
use crate::error::{InsightError, Result};

pub mod serpapi;
pub mod traits;

pub use serpapi::SerpApiProvider;
pub use traits::{ArticleProvider, OrganicResult, SearchError};

/// Remedy or treatment article found for a predicted disease
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub url: Option<String>,
}

impl From<OrganicResult> for Article {
    fn from(r: OrganicResult) -> Self {
        Self {
            title: r.title,
            snippet: r.snippet,
            url: r.link,
        }
    }
}

/// Result of one enrichment attempt. Both variants are ordinary outcomes.
#[derive(Debug)]
pub enum SearchOutcome {
    Found(Vec<Article>),
    Unavailable(SearchError),
}

impl SearchOutcome {
    pub fn articles(&self) -> &[Article] {
        match self {
            SearchOutcome::Found(articles) => articles,
            SearchOutcome::Unavailable(_) => &[],
        }
    }

    pub fn into_articles(self) -> Vec<Article> {
        match self {
            SearchOutcome::Found(articles) => articles,
            SearchOutcome::Unavailable(_) => Vec::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SearchOutcome::Unavailable(_))
    }
}

/// Provider used when search is switched off in configuration
pub struct DisabledProvider;

#[async_trait]
impl ArticleProvider for DisabledProvider {
    async fn search(
        &self,
        _query: &str,
        _limit: usize,
    ) -> std::result::Result<Vec<OrganicResult>, SearchError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// Wraps a provider with the query format, result bound and timeout
#[derive(Clone)]
pub struct ArticleSearch {
    provider: Arc<dyn ArticleProvider>,
    intent: String,
    max_results: usize,
    timeout: Duration,
}

impl ArticleSearch {
    pub fn new(provider: Arc<dyn ArticleProvider>, config: &SearchConfig) -> Self {
        Self {
            provider,
            intent: config.intent.clone(),
            max_results: config.max_results.clamp(1, MAX_ARTICLES),
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        }
    }

    /// Build the configured provider; a missing credential is a startup error
    pub fn from_config(config: &Config) -> Result<Self> {
        if !config.search.enabled {
            info!("Article search disabled by configuration");
            return Ok(Self::new(Arc::new(DisabledProvider), &config.search));
        }
        let key = config.runtime.serpapi_key.clone().ok_or_else(|| {
            InsightError::config("article search is enabled but SERPAPI_KEY is not set")
        })?;
        let provider = SerpApiProvider::new(&config.search, key)?;
        info!(
            "Using SerpAPI article search (engine={}, timeout={}ms)",
            config.search.engine, config.search.timeout_ms
        );
        Ok(Self::new(Arc::new(provider), &config.search))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn query_for(&self, disease_label: &str) -> String {
        format!("{} {}", disease_label, self.intent)
    }

    /// Single attempt, bounded by the timeout; failures become `Unavailable`
    pub async fn search_articles(&self, disease_label: &str) -> SearchOutcome {
        let query = self.query_for(disease_label);
        let call = self.provider.search(&query, self.max_results);

        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(results)) => SearchOutcome::Found(
                results
                    .into_iter()
                    .take(self.max_results)
                    .map(Article::from)
                    .collect(),
            ),
            Ok(Err(e)) => SearchOutcome::Unavailable(e),
            Err(_) => SearchOutcome::Unavailable(SearchError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        };

        match &outcome {
            SearchOutcome::Found(articles) => debug!(
                "{} returned {} articles for '{}'",
                self.provider.name(),
                articles.len(),
                disease_label
            ),
            SearchOutcome::Unavailable(e) => warn!(
                "Article search via {} failed for '{}': {}",
                self.provider.name(),
                disease_label,
                e
            ),
        }
        outcome
    }
}

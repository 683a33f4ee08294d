use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One organic result as the provider returns it; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("search timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("provider rejected the credential")]
    Unauthorized,
    #[error("provider quota or rate limit exceeded")]
    QuotaExceeded,
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse provider response: {0}")]
    Parse(String),
    #[error("provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait ArticleProvider: Send + Sync {
    /// Run one query, asking for at most `limit` results
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<OrganicResult>, SearchError>;

    /// Short identifier used in logs and `/info`
    fn name(&self) -> &str;
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{InsightError, Result};

/// Hard upper bound on enrichment articles per prediction
pub const MAX_ARTICLES: usize = 3;

/// Main configuration structure loaded from symptom_insight.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub artifacts: ArtifactsConfig,
    pub knowledge: KnowledgeConfig,
    pub search: SearchConfig,
    pub feedback: FeedbackConfig,
    pub server: ServerConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Locations of the three artifacts produced by the training job
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    /// JSON array of symptom names, or a training CSV whose header is the vocabulary
    pub vocabulary: String,
    /// Target column dropped from a CSV header
    pub target_column: String,
    pub label_encoder: String,
    pub model: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("saved_model"),
            vocabulary: "symptoms.json".to_string(),
            target_column: "prognosis".to_string(),
            label_encoder: "label_encoder.json".to_string(),
            model: "random_forest.json".to_string(),
        }
    }
}

impl ArtifactsConfig {
    pub fn vocabulary_path(&self) -> PathBuf {
        self.dir.join(&self.vocabulary)
    }

    pub fn label_encoder_path(&self) -> PathBuf {
        self.dir.join(&self.label_encoder)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model)
    }
}

/// Disease knowledge base source; `None` uses the built-in data set
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub path: Option<PathBuf>,
}

/// External article search behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub base_url: String,
    pub engine: String,
    /// Appended to the disease label to form the query
    pub intent: String,
    pub max_results: usize,
    pub timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://serpapi.com/search.json".to_string(),
            engine: "google".to_string(),
            intent: "remedy OR treatment".to_string(),
            max_results: MAX_ARTICLES,
            timeout_ms: 5000,
        }
    }
}

/// Feedback log settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub path: PathBuf,
    pub separator: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("user_feedback.txt"),
            separator: "---".to_string(),
        }
    }
}

/// HTTP boundary settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: std::net::SocketAddr,
    /// Decline empty symptom selections before they reach the pipeline
    pub require_symptoms: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: std::net::SocketAddr::from(([127, 0, 0, 1], 7860)),
            require_symptoms: true,
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub serpapi_key: Option<String>,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            log_level: "symptom_insight=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let is_placeholder = |s: &str| {
            let t = s.trim();
            t.is_empty()
                || t.contains("${")
                || t.eq_ignore_ascii_case("your-api-key-here")
                || t.eq_ignore_ascii_case("changeme")
        };

        Self {
            serpapi_key: std::env::var("SERPAPI_KEY")
                .ok()
                .filter(|k| !is_placeholder(k)),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "symptom_insight=info".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses INSIGHT_CONFIG environment variable or defaults to "symptom_insight.toml"
    pub fn load() -> Result<Self> {
        load_env_file();

        let config_path = std::env::var("INSIGHT_CONFIG")
            .unwrap_or_else(|_| "symptom_insight.toml".to_string());

        let mut config = Self::from_file_or_default(Path::new(&config_path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Parse the TOML file at `path`; only a missing file falls back to defaults
    pub fn from_file_or_default(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(InsightError::config(format!(
                "cannot read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply INSIGHT_* overrides read through `lookup`. Unparsable values are errors.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("INSIGHT_ARTIFACTS_DIR") {
            self.artifacts.dir = PathBuf::from(dir);
            tracing::debug!("INSIGHT_ARTIFACTS_DIR env override applied");
        }
        if let Some(path) = lookup("INSIGHT_KNOWLEDGE_PATH") {
            self.knowledge.path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("INSIGHT_FEEDBACK_PATH") {
            self.feedback.path = PathBuf::from(path);
        }
        if let Some(v) = lookup("INSIGHT_HTTP_BIND") {
            self.server.bind = v.trim().parse().map_err(|e| {
                InsightError::config(format!("INSIGHT_HTTP_BIND '{}' is invalid: {}", v, e))
            })?;
        }
        if let Some(v) = lookup("INSIGHT_SEARCH_ENABLED") {
            self.search.enabled = parse_flag("INSIGHT_SEARCH_ENABLED", &v)?;
            tracing::debug!("INSIGHT_SEARCH_ENABLED={} applied", self.search.enabled);
        }
        if let Some(v) = lookup("INSIGHT_SEARCH_TIMEOUT_MS") {
            self.search.timeout_ms = v.trim().parse::<u64>().map_err(|e| {
                InsightError::config(format!(
                    "INSIGHT_SEARCH_TIMEOUT_MS '{}' is invalid: {}",
                    v, e
                ))
            })?;
        }
        if let Some(url) = lookup("INSIGHT_SEARCH_BASE_URL") {
            self.search.base_url = url;
        }
        Ok(())
    }

    /// Validate and clamp values. The search credential is checked when the provider is built.
    pub fn validate(&mut self) -> Result<()> {
        if self.search.max_results == 0 {
            tracing::warn!("search.max_results is 0, raising to 1");
            self.search.max_results = 1;
        } else if self.search.max_results > MAX_ARTICLES {
            tracing::warn!(
                "search.max_results {} exceeds max {}, clamping",
                self.search.max_results,
                MAX_ARTICLES
            );
            self.search.max_results = MAX_ARTICLES;
        }

        if self.search.timeout_ms == 0 {
            return Err(InsightError::config("search.timeout_ms must be > 0"));
        }

        if self.feedback.separator.trim().is_empty() {
            return Err(InsightError::config("feedback.separator must not be blank"));
        }

        Ok(())
    }
}

/// Load `.env` variables: INSIGHT_ENV_FILE if set, else ./.env. Variables already set win.
pub fn load_env_file() {
    let path = std::env::var("INSIGHT_ENV_FILE").unwrap_or_else(|_| ".env".to_string());
    load_env_file_from(Path::new(&path));
}

/// Returns false when the file is missing or unreadable
pub fn load_env_file_from(path: &Path) -> bool {
    dotenvy::from_path(path).is_ok()
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(InsightError::config(format!(
            "{} '{}' is not a boolean (use true/false)",
            name, value
        ))),
    }
}

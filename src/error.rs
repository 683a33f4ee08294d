//! Domain-specific error types for symptom-insight

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the symptom-insight service
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Model artifact error ({artifact}): {message}")]
    Artifact { artifact: String, message: String },

    #[error("Inference error: {message}")]
    Inference { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl InsightError {
    /// Shorthand for configuration errors raised while validating inputs at startup
    pub fn config(message: impl Into<String>) -> Self {
        InsightError::Config {
            message: message.into(),
        }
    }

    pub fn artifact(artifact: impl Into<String>, message: impl Into<String>) -> Self {
        InsightError::Artifact {
            artifact: artifact.into(),
            message: message.into(),
        }
    }

    /// True for errors that must abort startup rather than fail a single request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InsightError::Config { .. } | InsightError::Artifact { .. }
        )
    }
}

impl From<anyhow::Error> for InsightError {
    fn from(err: anyhow::Error) -> Self {
        InsightError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for InsightError {
    fn from(err: serde_json::Error) -> Self {
        InsightError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for InsightError {
    fn from(err: toml::de::Error) -> Self {
        InsightError::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}

impl From<std::io::Error> for InsightError {
    fn from(err: std::io::Error) -> Self {
        InsightError::Persistence {
            message: err.to_string(),
        }
    }
}

/// Convert InsightError to an HTTP response
impl IntoResponse for InsightError {
    fn into_response(self) -> Response {
        let (status, label) = match &self {
            InsightError::Config { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error")
            }
            InsightError::Artifact { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Model artifact error")
            }
            InsightError::Inference { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Inference error"),
            InsightError::Validation { .. } => (StatusCode::BAD_REQUEST, "Validation error"),
            InsightError::Persistence { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Persistence error")
            }
            InsightError::Serialization { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error")
            }
            InsightError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            json!({
                "error": {
                    "code": status.as_u16(),
                    "kind": label,
                    "message": self.to_string()
                }
            })
            .to_string(),
        )
            .into_response()
    }
}

/// Result type alias for symptom-insight operations
pub type Result<T> = std::result::Result<T, InsightError>;

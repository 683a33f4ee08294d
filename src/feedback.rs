//! Append-only feedback log

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::FeedbackConfig;
use crate::error::{InsightError, Result};

const THANKS: &str = "Thank you for your feedback!";
const EMPTY: &str = "Please enter feedback before submitting.";

/// Outcome of one submission. `Declined` means nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedbackOutcome {
    Accepted { message: String },
    Declined { message: String },
    Failed { message: String },
}

impl FeedbackOutcome {
    pub fn accepted(&self) -> bool {
        matches!(self, FeedbackOutcome::Accepted { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            FeedbackOutcome::Accepted { message }
            | FeedbackOutcome::Declined { message }
            | FeedbackOutcome::Failed { message } => message,
        }
    }
}

/// Serializes appends to a single log file
#[derive(Debug)]
pub struct FeedbackSink {
    path: PathBuf,
    separator: String,
    lock: Mutex<()>,
}

impl FeedbackSink {
    pub fn new(path: impl Into<PathBuf>, separator: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            separator: separator.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self::new(config.path.clone(), config.separator.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate and append. Returns only after the write has completed or failed.
    pub fn submit(&self, text: &str) -> FeedbackOutcome {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return FeedbackOutcome::Declined {
                message: EMPTY.to_string(),
            };
        }

        match self.append(trimmed) {
            Ok(()) => {
                tracing::info!("Recorded feedback ({} chars)", trimmed.chars().count());
                FeedbackOutcome::Accepted {
                    message: THANKS.to_string(),
                }
            }
            Err(e) => {
                tracing::error!(
                    "Failed to write feedback to {}: {}",
                    self.path.display(),
                    e
                );
                FeedbackOutcome::Failed {
                    message: format!("Could not save feedback: {}", e),
                }
            }
        }
    }

    fn append(&self, entry: &str) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| InsightError::Persistence {
            message: "feedback log lock poisoned".into(),
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Entry and separator go out in a single write
        let record = format!("{}\n{}\n", entry, self.separator);
        file.write_all(record.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_declined_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.txt");
        let sink = FeedbackSink::new(&path, "---");

        for text in ["", "   ", "\n\t"] {
            let outcome = sink.submit(text);
            assert!(!outcome.accepted());
            assert!(matches!(outcome, FeedbackOutcome::Declined { .. }));
        }
        assert!(!path.exists());
    }

    #[test]
    fn accepted_text_is_trimmed_and_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.txt");
        let sink = FeedbackSink::new(&path, "---");

        let outcome = sink.submit("  great tool \n");
        assert!(outcome.accepted());
        assert_eq!(outcome.message(), "Thank you for your feedback!");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "great tool\n---\n");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nested/feedback.txt");
        let sink = FeedbackSink::new(&path, "---");
        assert!(sink.submit("ok").accepted());
        assert!(path.exists());
    }

    #[test]
    fn unwritable_store_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let sink = FeedbackSink::new(dir.path(), "---");
        let outcome = sink.submit("will not land");
        assert!(matches!(outcome, FeedbackOutcome::Failed { .. }));
        assert!(outcome.message().starts_with("Could not save feedback"));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(FeedbackOutcome::Declined {
            message: EMPTY.into(),
        })
        .unwrap();
        assert_eq!(json["status"], "declined");
        assert_eq!(json["message"], EMPTY);
    }
}

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{InsightError, Result};

/// Bidirectional mapping between encoded class indices and disease names
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct LabelEncoderFile {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self> {
        if classes.is_empty() {
            return Err(InsightError::config("label encoder has no classes"));
        }
        let mut index = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            if index.insert(class.clone(), i).is_some() {
                return Err(InsightError::config(format!(
                    "label encoder contains duplicate class '{}'",
                    class
                )));
            }
        }
        Ok(Self { classes, index })
    }

    /// Load `{ "classes": [..] }` exported from the fitted encoder
    pub fn load(path: &Path) -> Result<Self> {
        let artifact = path.display().to_string();
        let content = std::fs::read_to_string(path)
            .map_err(|e| InsightError::artifact(&artifact, e.to_string()))?;
        let file: LabelEncoderFile = serde_json::from_str(&content)
            .map_err(|e| InsightError::artifact(&artifact, e.to_string()))?;
        Self::new(file.classes).map_err(|e| InsightError::artifact(&artifact, e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn decode(&self, class_index: usize) -> Option<&str> {
        self.classes.get(class_index).map(String::as_str)
    }
}

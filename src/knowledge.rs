//! Disease knowledge base: curated, read-only metadata keyed by disease label

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{InsightError, Result};

const BUILTIN: &str = include_str!("../data/diseases.toml");

/// Named reference link shown alongside a prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub url: String,
}

/// Descriptive metadata for one disease. Empty fields are omitted when rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseRecord {
    pub description: String,
    pub causes: String,
    pub symptoms: Vec<String>,
    pub treatments: String,
    pub resources: Vec<Resource>,
    pub severity: String,
}

impl DiseaseRecord {
    /// Sentinel returned for labels without a curated entry
    pub fn unknown() -> Self {
        Self {
            description: "No information available.".to_string(),
            severity: "Consult a doctor.".to_string(),
            ..Self::default()
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

#[derive(Deserialize)]
struct DiseaseEntry {
    label: String,
    #[serde(flatten)]
    record: DiseaseRecord,
}

#[derive(Deserialize)]
struct KnowledgeFile {
    #[serde(default)]
    disease: Vec<DiseaseEntry>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    records: HashMap<String, DiseaseRecord>,
    unknown: DiseaseRecord,
}

impl KnowledgeBase {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: KnowledgeFile = toml::from_str(content)?;
        let mut records = HashMap::with_capacity(file.disease.len());
        for entry in file.disease {
            let label = entry.label.trim().to_string();
            if label.is_empty() {
                return Err(InsightError::config("knowledge base entry has a blank label"));
            }
            if records.contains_key(&label) {
                return Err(InsightError::config(format!(
                    "knowledge base lists '{}' more than once",
                    label
                )));
            }
            records.insert(label, entry.record);
        }
        Ok(Self {
            records,
            unknown: DiseaseRecord::unknown(),
        })
    }

    /// Curated entries shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| InsightError::artifact(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` when given, otherwise the built-in set
    pub fn from_config(path: Option<&Path>) -> Result<Self> {
        let kb = match path {
            Some(p) => Self::load(p)?,
            None => Self::builtin()?,
        };
        tracing::info!("Knowledge base ready with {} diseases", kb.len());
        Ok(kb)
    }

    /// Never fails; unknown labels get the sentinel record
    pub fn lookup(&self, label: &str) -> &DiseaseRecord {
        self.records.get(label).unwrap_or(&self.unknown)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.records.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

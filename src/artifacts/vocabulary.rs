//! Symptom vocabulary and the binary feature encoder built on it

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{InsightError, Result};

/// Minimum normalized Levenshtein similarity for a "did you mean" suggestion
const SUGGESTION_FLOOR: f64 = 0.7;

/// Ordered, duplicate-free list of recognized symptom names.
///
/// Index `i` of every [`FeatureVector`] refers to `names()[i]` for the lifetime
/// of the process.
#[derive(Debug, Clone)]
pub struct SymptomVocabulary {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

/// One binary value per vocabulary entry, in vocabulary order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureVector(Vec<u8>);

impl FeatureVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Value at `i` as a model input
    pub fn value(&self, i: usize) -> Option<f64> {
        self.0.get(i).map(|&v| f64::from(v))
    }

    /// Number of symptoms switched on
    pub fn active(&self) -> usize {
        self.0.iter().filter(|&&v| v == 1).count()
    }
}

impl From<Vec<u8>> for FeatureVector {
    fn from(values: Vec<u8>) -> Self {
        Self(values.into_iter().map(|v| u8::from(v != 0)).collect())
    }
}

impl SymptomVocabulary {
    /// Build a vocabulary, rejecting blank or duplicate names
    pub fn new(names: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(InsightError::config(format!(
                    "vocabulary entry {} is blank",
                    i
                )));
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(InsightError::config(format!(
                    "vocabulary contains duplicate symptom '{}'",
                    name
                )));
            }
        }
        if names.is_empty() {
            return Err(InsightError::config("vocabulary is empty"));
        }
        Ok(Self { names, index })
    }

    /// Load from a JSON array, or from the header row of a training CSV
    pub fn load(path: &Path, target_column: &str) -> Result<Self> {
        let artifact = path.display().to_string();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        let names = if is_csv {
            let mut reader = csv::Reader::from_path(path)
                .map_err(|e| InsightError::artifact(&artifact, e.to_string()))?;
            let headers = reader
                .headers()
                .map_err(|e| InsightError::artifact(&artifact, e.to_string()))?;
            headers
                .iter()
                .map(str::trim)
                .filter(|h| *h != target_column)
                .map(str::to_string)
                .collect()
        } else {
            let content = std::fs::read_to_string(path)
                .map_err(|e| InsightError::artifact(&artifact, e.to_string()))?;
            serde_json::from_str::<Vec<String>>(&content)
                .map_err(|e| InsightError::artifact(&artifact, e.to_string()))?
        };

        Self::new(names).map_err(|e| InsightError::artifact(&artifact, e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Encode a selection. Names outside the vocabulary are ignored.
    pub fn encode<I, S>(&self, selected: I) -> FeatureVector
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vector = FeatureVector::zeros(self.names.len());
        for name in selected {
            let name = name.as_ref();
            match self.index.get(name) {
                Some(&i) => vector.0[i] = 1,
                None => tracing::debug!("ignoring unknown symptom '{}'", name),
            }
        }
        vector
    }

    /// Split a selection into known and unknown names, preserving input order
    pub fn partition<'a, I>(&self, selected: I) -> (Vec<&'a str>, Vec<&'a str>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        selected.into_iter().partition(|name| self.contains(name))
    }

    /// Closest vocabulary entry for a misspelled name, if any is close enough
    pub fn suggest(&self, name: &str) -> Option<&str> {
        let needle = name.trim().to_lowercase().replace(' ', "_");
        self.names
            .iter()
            .map(|candidate| {
                let score =
                    strsim::normalized_levenshtein(&needle, &candidate.to_lowercase());
                (candidate, score)
            })
            .filter(|(_, score)| *score >= SUGGESTION_FLOOR)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(candidate, _)| candidate.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn vocab() -> SymptomVocabulary {
        SymptomVocabulary::new(vec![
            "itching".into(),
            "rash".into(),
            "sneezing".into(),
        ])
        .unwrap()
    }

    #[test]
    fn encode_sets_selected_positions() {
        let selected: HashSet<String> = ["itching", "rash"].iter().map(|s| s.to_string()).collect();
        let v = vocab().encode(&selected);
        assert_eq!(v.as_slice(), &[1, 1, 0]);
        assert_eq!(v.active(), 2);
    }

    #[test]
    fn encode_empty_is_all_zero() {
        let v = vocab().encode(Vec::<String>::new());
        assert_eq!(v.as_slice(), &[0, 0, 0]);
    }

    #[test]
    fn encode_ignores_unknown_names() {
        let v = vocab().encode(["sneezing", "headache", ""]);
        assert_eq!(v.as_slice(), &[0, 0, 1]);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn encode_is_exact_match() {
        let v = vocab().encode(["Itching", " rash"]);
        assert_eq!(v.as_slice(), &[0, 0, 0]);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = SymptomVocabulary::new(vec!["a".into(), "b".into(), "a".into()]).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn blank_and_empty_vocabularies_are_rejected() {
        assert!(SymptomVocabulary::new(vec![]).is_err());
        assert!(SymptomVocabulary::new(vec!["a".into(), "  ".into()]).is_err());
    }

    #[test]
    fn partition_keeps_order() {
        let vocab = vocab();
        let (known, unknown) = vocab.partition(["rash", "fever", "itching"]);
        assert_eq!(known, vec!["rash", "itching"]);
        assert_eq!(unknown, vec!["fever"]);
    }

    #[test]
    fn suggest_finds_close_names() {
        let vocab = SymptomVocabulary::new(vec![
            "skin_rash".into(),
            "nodal_skin_eruptions".into(),
            "continuous_sneezing".into(),
        ])
        .unwrap();
        assert_eq!(vocab.suggest("skin rash"), Some("skin_rash"));
        assert_eq!(vocab.suggest("skin_rsh"), Some("skin_rash"));
        assert_eq!(vocab.suggest("headache"), None);
    }

    #[test]
    fn feature_vector_from_normalizes_to_binary() {
        let v = FeatureVector::from(vec![0, 3, 1]);
        assert_eq!(v.as_slice(), &[0, 1, 1]);
        assert_eq!(v.value(1), Some(1.0));
        assert_eq!(v.value(5), None);
    }
}

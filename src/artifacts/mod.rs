//! Model artifact store: vocabulary, label encoder and classifier, loaded once at startup

use std::sync::Arc;

use crate::classifier::{self, Classifier, Prediction};
use crate::config::ArtifactsConfig;
use crate::error::{InsightError, Result};

pub mod forest;
pub mod label_encoder;
pub mod vocabulary;

pub use forest::RandomForest;
pub use label_encoder::LabelEncoder;
pub use vocabulary::{FeatureVector, SymptomVocabulary};

/// Immutable, process-wide model context shared by every request
#[derive(Clone)]
pub struct ModelArtifacts {
    vocabulary: SymptomVocabulary,
    labels: LabelEncoder,
    classifier: Arc<dyn Classifier>,
    fingerprint: Option<String>,
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("symptoms", &self.vocabulary.len())
            .field("classes", &self.labels.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl ModelArtifacts {
    /// Assemble artifacts, rejecting any dimension disagreement between them
    pub fn from_parts(
        vocabulary: SymptomVocabulary,
        labels: LabelEncoder,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self> {
        if classifier.n_features() != vocabulary.len() {
            return Err(InsightError::config(format!(
                "classifier was trained on {} features but the vocabulary has {} symptoms",
                classifier.n_features(),
                vocabulary.len()
            )));
        }
        if classifier.n_classes() != labels.len() {
            return Err(InsightError::config(format!(
                "classifier predicts {} classes but the label encoder knows {}",
                classifier.n_classes(),
                labels.len()
            )));
        }
        Ok(Self {
            vocabulary,
            labels,
            classifier,
            fingerprint: None,
        })
    }

    /// Load all three artifacts from disk. Any failure is fatal.
    pub fn load(config: &ArtifactsConfig) -> Result<Self> {
        let vocab_path = config.vocabulary_path();
        let vocabulary = SymptomVocabulary::load(&vocab_path, &config.target_column)?;
        let labels = LabelEncoder::load(&config.label_encoder_path())?;

        let model_path = config.model_path();
        let model_bytes = std::fs::read(&model_path)
            .map_err(|e| InsightError::artifact(model_path.display().to_string(), e.to_string()))?;
        let fingerprint = blake3::hash(&model_bytes).to_hex().to_string();
        let forest = RandomForest::from_slice(&model_bytes)
            .map_err(|e| InsightError::artifact(model_path.display().to_string(), e.to_string()))?;

        tracing::info!(
            "Loaded model artifacts: {} symptoms, {} classes, {} trees / {} nodes (blake3 {})",
            vocabulary.len(),
            labels.len(),
            forest.tree_count(),
            forest.node_count(),
            &fingerprint[..12]
        );

        let mut artifacts = Self::from_parts(vocabulary, labels, Arc::new(forest))?;
        artifacts.fingerprint = Some(fingerprint);
        Ok(artifacts)
    }

    pub fn vocabulary(&self) -> &SymptomVocabulary {
        &self.vocabulary
    }

    pub fn labels(&self) -> &LabelEncoder {
        &self.labels
    }

    /// BLAKE3 hex digest of the model file, when loaded from disk
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn encode<I, S>(&self, selected: I) -> FeatureVector
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.vocabulary.encode(selected)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        classifier::predict(self.classifier.as_ref(), &self.labels, features)
    }
}

//! Classifier seam and the argmax adapter that turns class probabilities into a Prediction

use serde::{Deserialize, Serialize};

use crate::artifacts::{FeatureVector, LabelEncoder};
use crate::error::{InsightError, Result};
use crate::utils::math::argmax_first;

/// A fitted multi-class model exposing class probabilities
pub trait Classifier: Send + Sync {
    /// Feature count the model was trained on
    fn n_features(&self) -> usize;

    /// Class count, in the label encoder's index order
    fn n_classes(&self) -> usize;

    /// One probability per class for a single sample
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>>;
}

/// Most likely disease and the probability mass assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub disease_label: String,
    pub confidence: f64,
}

/// Run the classifier over one vector and decode the winning class.
///
/// Dimension mismatches are configuration errors: the artifacts disagree with
/// each other and no request can succeed until they are fixed.
pub fn predict(
    classifier: &dyn Classifier,
    labels: &LabelEncoder,
    features: &FeatureVector,
) -> Result<Prediction> {
    if features.len() != classifier.n_features() {
        return Err(InsightError::config(format!(
            "feature vector has {} entries but the classifier expects {}",
            features.len(),
            classifier.n_features()
        )));
    }

    let probabilities = classifier.predict_proba(features)?;
    select_prediction(&probabilities, labels)
}

/// Pick the first maximal class and map it to its label
pub fn select_prediction(probabilities: &[f64], labels: &LabelEncoder) -> Result<Prediction> {
    if probabilities.len() != labels.len() {
        return Err(InsightError::config(format!(
            "classifier returned {} probabilities for {} classes",
            probabilities.len(),
            labels.len()
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
        return Err(InsightError::Inference {
            message: format!("classifier returned non-finite probability {}", bad),
        });
    }

    let (class_index, probability) =
        argmax_first(probabilities).ok_or_else(|| InsightError::Inference {
            message: "classifier returned no probabilities".into(),
        })?;

    let disease_label = labels
        .decode(class_index)
        .ok_or_else(|| {
            InsightError::config(format!("class index {} has no label", class_index))
        })?
        .to_string();

    Ok(Prediction {
        disease_label,
        confidence: probability.clamp(0.0, 1.0),
    })
}

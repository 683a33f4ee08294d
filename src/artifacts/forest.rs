//! Random forest loaded from the array export of its fitted decision trees.
//!
//! Each tree is stored as parallel node arrays. Node `i` is a leaf when both of
//! its children are `-1`; otherwise a sample goes left when
//! `x[feature[i]] <= threshold[i]`. Leaf `value` rows hold per-class weights
//! which are normalized into probabilities. The forest averages the per-tree
//! probabilities.

use serde::Deserialize;
use std::path::Path;

use crate::artifacts::FeatureVector;
use crate::classifier::Classifier;
use crate::error::{InsightError, Result};
use crate::utils::math::normalize;

const LEAF: i64 = -1;

#[derive(Debug, Clone, Deserialize)]
pub struct TreeExport {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForestExport {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<TreeExport>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probabilities: Vec<f64>,
    },
}

/// A validated decision tree; traversal always terminates at a leaf
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn from_export(export: &TreeExport, n_features: usize, n_classes: usize) -> Result<Self> {
        let n = export.children_left.len();
        if n == 0 {
            return Err(InsightError::config("tree has no nodes"));
        }
        if export.children_right.len() != n
            || export.feature.len() != n
            || export.threshold.len() != n
            || export.value.len() != n
        {
            return Err(InsightError::config(format!(
                "tree arrays differ in length (left={}, right={}, feature={}, threshold={}, value={})",
                n,
                export.children_right.len(),
                export.feature.len(),
                export.threshold.len(),
                export.value.len()
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (export.children_left[i], export.children_right[i]);
            if left == LEAF && right == LEAF {
                let row = &export.value[i];
                if row.len() != n_classes {
                    return Err(InsightError::config(format!(
                        "leaf {} has {} class weights, expected {}",
                        i,
                        row.len(),
                        n_classes
                    )));
                }
                if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(InsightError::config(format!(
                        "leaf {} has a negative or non-finite class weight",
                        i
                    )));
                }
                let probabilities = normalize(row).ok_or_else(|| {
                    InsightError::config(format!("leaf {} has zero total weight", i))
                })?;
                nodes.push(Node::Leaf { probabilities });
                continue;
            }

            // Children must come after their parent so traversal cannot cycle
            let child = |c: i64| -> Result<usize> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| {
                        InsightError::config(format!("node {} has invalid child index {}", i, c))
                    })
            };
            let feature = usize::try_from(export.feature[i])
                .ok()
                .filter(|&f| f < n_features)
                .ok_or_else(|| {
                    InsightError::config(format!(
                        "node {} splits on feature {} but the model has {} features",
                        i, export.feature[i], n_features
                    ))
                })?;
            let threshold = export.threshold[i];
            if !threshold.is_finite() {
                return Err(InsightError::config(format!(
                    "node {} has a non-finite threshold",
                    i
                )));
            }
            nodes.push(Node::Split {
                feature,
                threshold,
                left: child(left)?,
                right: child(right)?,
            });
        }

        Ok(Self { nodes })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Class probabilities at the leaf this sample falls into
    pub fn leaf_probabilities(&self, features: &FeatureVector) -> &[f64] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { probabilities } => return probabilities,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // Validation guarantees feature < n_features == features.len()
                    let x = features.value(*feature).unwrap_or(0.0);
                    i = if x <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Averaging ensemble of decision trees
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn from_export(export: ForestExport) -> Result<Self> {
        if export.n_features == 0 || export.n_classes == 0 {
            return Err(InsightError::config(
                "forest must declare at least one feature and one class",
            ));
        }
        if export.trees.is_empty() {
            return Err(InsightError::config("forest has no trees"));
        }
        let trees = export
            .trees
            .iter()
            .enumerate()
            .map(|(t, tree)| {
                DecisionTree::from_export(tree, export.n_features, export.n_classes).map_err(
                    |e| match e {
                        InsightError::Config { message } => {
                            InsightError::config(format!("tree {}: {}", t, message))
                        }
                        other => other,
                    },
                )
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            n_features: export.n_features,
            n_classes: export.n_classes,
            trees,
        })
    }

    /// Parse a forest export from raw JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let export: ForestExport = serde_json::from_slice(bytes)?;
        Self::from_export(export)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let artifact = path.display().to_string();
        let bytes =
            std::fs::read(path).map_err(|e| InsightError::artifact(&artifact, e.to_string()))?;
        Self::from_slice(&bytes).map_err(|e| InsightError::artifact(&artifact, e.to_string()))
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Total nodes across all trees
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(DecisionTree::node_count).sum()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            return Err(InsightError::config(format!(
                "feature vector has {} entries but the forest expects {}",
                features.len(),
                self.n_features
            )));
        }
        let mut sum = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_probabilities(features)) {
                *acc += p;
            }
        }
        let count = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / count).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stump on feature 0: absent -> class 0 heavy, present -> class 1 heavy
    fn stump(feature: i64, low: [f64; 2], high: [f64; 2]) -> TreeExport {
        TreeExport {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![feature, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![vec![1.0, 1.0], low.to_vec(), high.to_vec()],
        }
    }

    fn forest(trees: Vec<TreeExport>) -> Result<RandomForest> {
        RandomForest::from_export(ForestExport {
            n_features: 2,
            n_classes: 2,
            trees,
        })
    }

    #[test]
    fn single_tree_routes_on_threshold() {
        let f = forest(vec![stump(0, [3.0, 1.0], [0.0, 4.0])]).unwrap();
        let low = f.predict_proba(&FeatureVector::from(vec![0, 1])).unwrap();
        assert_eq!(low, vec![0.75, 0.25]);
        let high = f.predict_proba(&FeatureVector::from(vec![1, 0])).unwrap();
        assert_eq!(high, vec![0.0, 1.0]);
    }

    #[test]
    fn forest_averages_trees() {
        let f = forest(vec![
            stump(0, [1.0, 0.0], [0.0, 1.0]),
            stump(1, [1.0, 0.0], [1.0, 1.0]),
        ])
        .unwrap();
        let p = f.predict_proba(&FeatureVector::from(vec![1, 1])).unwrap();
        assert!((p[0] - 0.25).abs() < 1e-12);
        assert!((p[1] - 0.75).abs() < 1e-12);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_backward_child_links() {
        let mut tree = stump(0, [1.0, 0.0], [0.0, 1.0]);
        tree.children_left = vec![0, -1, -1];
        let err = forest(vec![tree]).unwrap_err();
        assert!(err.to_string().contains("invalid child index"));
    }

    #[test]
    fn rejects_out_of_range_feature() {
        let err = forest(vec![stump(7, [1.0, 0.0], [0.0, 1.0])]).unwrap_err();
        assert!(err.to_string().contains("feature 7"));
    }

    #[test]
    fn rejects_ragged_arrays() {
        let mut tree = stump(0, [1.0, 0.0], [0.0, 1.0]);
        tree.threshold.pop();
        assert!(forest(vec![tree]).is_err());
    }

    #[test]
    fn rejects_zero_weight_leaf() {
        let err = forest(vec![stump(0, [0.0, 0.0], [0.0, 1.0])]).unwrap_err();
        assert!(err.to_string().contains("zero total weight"));
    }

    #[test]
    fn rejects_empty_forest() {
        assert!(forest(vec![]).is_err());
    }

    #[test]
    fn wrong_vector_length_is_refused() {
        let f = forest(vec![stump(0, [1.0, 0.0], [0.0, 1.0])]).unwrap();
        assert!(f.predict_proba(&FeatureVector::zeros(3)).is_err());
    }

    #[test]
    fn parses_json_export() {
        let json = br#"{
            "n_features": 2,
            "n_classes": 2,
            "trees": [{
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [1, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[2, 2], [2, 0], [0, 2]]
            }]
        }"#;
        let f = RandomForest::from_slice(json).unwrap();
        assert_eq!(f.tree_count(), 1);
        assert_eq!(
            f.predict_proba(&FeatureVector::from(vec![0, 1])).unwrap(),
            vec![0.0, 1.0]
        );
    }
}

use std::io::Read;

use serde::Deserialize;

use super::domain::FeatureVector;

/// Trained classifier: one feature row in, one class index out.
pub trait ClassifierModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError>;
}

/// Failures raised while running the classifier on an assembled row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("model expects {expected} features, received {found}")]
    FeatureCountMismatch { expected: usize, found: usize },
    #[error("feature at position {position} should be '{expected}', received '{found}'")]
    FeatureNameMismatch {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("feature '{0}' is not a finite number")]
    NonFinite(String),
    #[error("model panicked during inference: {0}")]
    Panicked(String),
    #[error("{0}")]
    Model(String),
}

/// Structural problems found while loading a serialized forest.
#[derive(Debug, thiserror::Error)]
pub enum ModelFormatError {
    #[error("model JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model declares no classes")]
    NoClasses,
    #[error("model contains no trees")]
    NoTrees,
    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },
    #[error("tree {tree} node {node} references feature {feature}, model has {features}")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: usize,
        features: usize,
    },
    #[error("tree {tree} node {node} must point to later nodes inside the tree (found {child})")]
    InvalidChild {
        tree: usize,
        node: usize,
        child: usize,
    },
    #[error("tree {tree} leaf {node} carries {found} class weights, model has {expected} classes")]
    LeafWidth {
        tree: usize,
        node: usize,
        expected: usize,
        found: usize,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

/// Averaged-probability tree ensemble exported from the training pipeline.
///
/// A split sends a row left when `row[feature] <= threshold`. Leaves hold
/// per-class sample weights which are normalized before averaging, and the
/// first class with the highest mean probability wins.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionForest {
    feature_names: Vec<String>,
    classes: Vec<i64>,
    trees: Vec<DecisionTree>,
}

impl DecisionForest {
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, ModelFormatError> {
        let forest: DecisionForest = serde_json::from_reader(reader)?;
        forest.validate()?;
        Ok(forest)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), ModelFormatError> {
        if self.classes.is_empty() {
            return Err(ModelFormatError::NoClasses);
        }
        if self.trees.is_empty() {
            return Err(ModelFormatError::NoTrees);
        }

        let features = self.feature_names.len();
        for (tree, decision_tree) in self.trees.iter().enumerate() {
            let nodes = decision_tree.nodes.len();
            if nodes == 0 {
                return Err(ModelFormatError::EmptyTree { tree });
            }

            for (node, entry) in decision_tree.nodes.iter().enumerate() {
                match entry {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= features {
                            return Err(ModelFormatError::FeatureOutOfRange {
                                tree,
                                node,
                                feature: *feature,
                                features,
                            });
                        }
                        for child in [*left, *right] {
                            if child <= node || child >= nodes {
                                return Err(ModelFormatError::InvalidChild { tree, node, child });
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return Err(ModelFormatError::LeafWidth {
                                tree,
                                node,
                                expected: self.classes.len(),
                                found: value.len(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn check_row(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.feature_names.len() {
            return Err(InferenceError::FeatureCountMismatch {
                expected: self.feature_names.len(),
                found: features.len(),
            });
        }

        let mut row = Vec::with_capacity(features.len());
        for (position, ((name, value), expected)) in
            features.iter().zip(&self.feature_names).enumerate()
        {
            if name != expected {
                return Err(InferenceError::FeatureNameMismatch {
                    position,
                    expected: expected.clone(),
                    found: name.to_string(),
                });
            }
            if !value.is_finite() {
                return Err(InferenceError::NonFinite(name.to_string()));
            }
            row.push(value);
        }

        Ok(row)
    }

    /// Mean class probabilities across all trees.
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        let row = self.check_row(features)?;
        let mut totals = vec![0.0; self.classes.len()];

        for tree in &self.trees {
            let weights = tree.leaf(&row);
            let sum: f64 = weights.iter().sum();
            if sum <= 0.0 {
                continue;
            }
            for (total, weight) in totals.iter_mut().zip(weights) {
                *total += weight / sum;
            }
        }

        let count = self.trees.len() as f64;
        Ok(totals.into_iter().map(|total| total / count).collect())
    }
}

impl ClassifierModel for DecisionForest {
    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        let probabilities = self.predict_proba(features)?;
        let mut best = 0;
        for (index, probability) in probabilities.iter().enumerate() {
            if *probability > probabilities[best] {
                best = index;
            }
        }
        Ok(self.classes[best])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FOREST: &str = r#"{
        "feature_names": ["severity", "self_pay"],
        "classes": [0, 1],
        "trees": [
            {"nodes": [
                {"feature": 0, "threshold": 3.5, "left": 1, "right": 2},
                {"value": [8.0, 2.0]},
                {"feature": 1, "threshold": 0.5, "left": 3, "right": 4},
                {"value": [6.0, 4.0]},
                {"value": [1.0, 9.0]}
            ]},
            {"nodes": [{"value": [1.0, 1.0]}]}
        ]
    }"#;

    fn forest() -> DecisionForest {
        DecisionForest::from_json_reader(Cursor::new(FOREST)).expect("forest loads")
    }

    fn row(severity: f64, self_pay: f64) -> FeatureVector {
        FeatureVector::from_entries(vec![
            ("severity".to_string(), severity),
            ("self_pay".to_string(), self_pay),
        ])
    }

    #[test]
    fn averages_normalized_leaf_weights() {
        let forest = forest();
        let probabilities = forest.predict_proba(&row(5.0, 1.0)).expect("predicts");
        assert!((probabilities[0] - 0.3).abs() < 1e-9);
        assert!((probabilities[1] - 0.7).abs() < 1e-9);
        assert_eq!(forest.predict(&row(5.0, 1.0)), Ok(1));
        assert_eq!(forest.predict(&row(2.0, 1.0)), Ok(0));
    }

    #[test]
    fn threshold_is_inclusive_on_the_left() {
        assert_eq!(forest().predict(&row(3.5, 1.0)), Ok(0));
    }

    #[test]
    fn ties_resolve_to_the_first_class() {
        let json = FOREST.replace("[6.0, 4.0]", "[5.0, 5.0]");
        let forest = DecisionForest::from_json_reader(Cursor::new(json)).expect("forest loads");
        assert_eq!(forest.predict(&row(5.0, 0.0)), Ok(0));
    }

    #[test]
    fn rejects_rows_that_do_not_match_the_fitted_columns() {
        let forest = forest();
        let short = FeatureVector::from_entries(vec![("severity".to_string(), 1.0)]);
        assert_eq!(
            forest.predict(&short),
            Err(InferenceError::FeatureCountMismatch {
                expected: 2,
                found: 1
            })
        );

        let renamed = FeatureVector::from_entries(vec![
            ("self_pay".to_string(), 1.0),
            ("severity".to_string(), 1.0),
        ]);
        assert!(matches!(
            forest.predict(&renamed),
            Err(InferenceError::FeatureNameMismatch { position: 0, .. })
        ));

        assert_eq!(
            forest.predict(&row(f64::NAN, 0.0)),
            Err(InferenceError::NonFinite("severity".to_string()))
        );
    }

    #[test]
    fn load_rejects_structurally_invalid_forests() {
        let backwards = r#"{"feature_names": ["a"], "classes": [0, 1], "trees": [
            {"nodes": [{"feature": 0, "threshold": 1.0, "left": 0, "right": 1}, {"value": [1.0, 0.0]}]}
        ]}"#;
        assert!(matches!(
            DecisionForest::from_json_reader(Cursor::new(backwards)),
            Err(ModelFormatError::InvalidChild { child: 0, .. })
        ));

        let narrow_leaf = r#"{"feature_names": ["a"], "classes": [0, 1], "trees": [
            {"nodes": [{"value": [1.0]}]}
        ]}"#;
        assert!(matches!(
            DecisionForest::from_json_reader(Cursor::new(narrow_leaf)),
            Err(ModelFormatError::LeafWidth { expected: 2, found: 1, .. })
        ));

        let unknown_feature = r#"{"feature_names": ["a"], "classes": [0], "trees": [
            {"nodes": [{"feature": 3, "threshold": 1.0, "left": 1, "right": 2}, {"value": [1.0]}, {"value": [1.0]}]}
        ]}"#;
        assert!(matches!(
            DecisionForest::from_json_reader(Cursor::new(unknown_feature)),
            Err(ModelFormatError::FeatureOutOfRange { feature: 3, .. })
        ));

        let no_trees = r#"{"feature_names": ["a"], "classes": [0], "trees": []}"#;
        assert!(matches!(
            DecisionForest::from_json_reader(Cursor::new(no_trees)),
            Err(ModelFormatError::NoTrees)
        ));
    }
}

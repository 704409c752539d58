//! JSON classifier artifacts.
//!
//! The model is trained elsewhere (sklearn) and exported as a small JSON
//! document. Two estimator families are understood:
//!
//! ```text
//! {
//!   "feature_names": ["rainfall", "temperature", "humidity", "elevation", "month"],
//!   "classes": [0, 1],
//!   "estimator": { "type": "logistic_regression", "coefficients": [...], "intercept": -4.5 }
//! }
//! ```
//!
//! or `"estimator": { "type": "random_forest", "trees": [...] }` where each
//! tree mirrors sklearn's `tree_` arrays (`children_left`, `children_right`,
//! `feature`, `threshold`, `value`). A leaf has both children set to `-1`.
//!
//! Everything is validated when the artifact is turned into a classifier:
//! feature names must equal the active schema in order, classes must be
//! exactly `[0, 1]`, and tree structure must be well formed. Inference
//! afterwards cannot index out of bounds or loop.

use super::loader::LoadError;
use super::{check_input, Classifier, ClassifierError};
use crate::features::FeatureSchema;
use crate::model::EXPECTED_CLASSES;
use serde::Deserialize;

/// sklearn's marker for "no child".
const TREE_LEAF: i64 = -1;

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    /// Feature names in training order.
    pub feature_names: Vec<String>,
    /// Class labels in the order probability columns are reported.
    pub classes: Vec<i64>,
    pub estimator: Estimator,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    RandomForest {
        trees: Vec<TreeArrays>,
    },
}

/// Parallel node arrays for one fitted tree.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeArrays {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class counts (or fractions); only leaf rows are used.
    pub value: Vec<Vec<f64>>,
}

impl ModelArtifact {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Short estimator name for status lines.
    pub fn kind(&self) -> &'static str {
        match self.estimator {
            Estimator::LogisticRegression { .. } => "logistic_regression",
            Estimator::RandomForest { .. } => "random_forest",
        }
    }

    /// Checks the declared feature order and class order against what the
    /// service will feed and read.
    pub fn verify_layout(&self, schema: &FeatureSchema) -> Result<(), LoadError> {
        let expected = schema.field_names();
        if self.feature_names.len() != expected.len()
            || self.feature_names.iter().zip(&expected).any(|(a, b)| a != b)
        {
            return Err(LoadError::FeatureMismatch {
                schema: schema.name,
                expected: expected.iter().map(|s| s.to_string()).collect(),
                found: self.feature_names.clone(),
            });
        }

        if self.classes != EXPECTED_CLASSES {
            return Err(LoadError::ClassMismatch {
                found: self.classes.clone(),
            });
        }

        Ok(())
    }

    /// Validates the artifact against `schema` and builds the classifier.
    pub fn into_classifier(self, schema: &FeatureSchema) -> Result<Box<dyn Classifier>, LoadError> {
        self.verify_layout(schema)?;
        let n_features = self.feature_names.len();
        let n_classes = self.classes.len();

        let classifier: Box<dyn Classifier> = match self.estimator {
            Estimator::LogisticRegression {
                coefficients,
                intercept,
            } => Box::new(LogisticClassifier::new(coefficients, intercept, n_features)?),
            Estimator::RandomForest { trees } => {
                Box::new(ForestClassifier::from_trees(trees, n_features, n_classes)?)
            }
        };
        Ok(classifier)
    }
}

// ---------------------------------------------------------------------------
// Logistic regression
// ---------------------------------------------------------------------------

/// Binary logistic regression: `p(flood) = sigmoid(w·x + b)`.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    pub fn new(coefficients: Vec<f64>, intercept: f64, n_features: usize) -> Result<Self, LoadError> {
        if coefficients.len() != n_features {
            return Err(LoadError::InvalidEstimator(format!(
                "logistic regression has {} coefficients for {} features",
                coefficients.len(),
                n_features
            )));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(LoadError::InvalidEstimator(
                "logistic regression parameters must be finite".to_string(),
            ));
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    fn decision(&self, features: &[f64]) -> Result<f64, ClassifierError> {
        check_input(features, self.coefficients.len())?;
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum();
        Ok(dot + self.intercept)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticClassifier {
    fn classify(&self, features: &[f64]) -> Result<i64, ClassifierError> {
        let z = self.decision(features)?;
        Ok(if z > 0.0 { EXPECTED_CLASSES[1] } else { EXPECTED_CLASSES[0] })
    }

    fn score(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        let p = sigmoid(self.decision(features)?);
        Ok(vec![1.0 - p, p])
    }
}

// ---------------------------------------------------------------------------
// Random forest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_arrays(arrays: TreeArrays, n_features: usize, n_classes: usize) -> Result<Self, String> {
        let n = arrays.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if arrays.children_right.len() != n
            || arrays.feature.len() != n
            || arrays.threshold.len() != n
            || arrays.value.len() != n
        {
            return Err("inconsistent node array lengths".to_string());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = arrays.children_left[i];
            let right = arrays.children_right[i];

            if left == TREE_LEAF && right == TREE_LEAF {
                let row = &arrays.value[i];
                if row.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} class values, expected {}",
                        i,
                        row.len(),
                        n_classes
                    ));
                }
                if row.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(format!("leaf {} has negative or non-finite values", i));
                }
                let total: f64 = row.iter().sum();
                if total <= 0.0 {
                    return Err(format!("leaf {} has an empty class distribution", i));
                }
                nodes.push(Node::Leaf {
                    distribution: row.iter().map(|v| v / total).collect(),
                });
                continue;
            }

            // Children must come strictly after their parent, which rules out
            // cycles and keeps traversal bounded.
            let child_ok = |c: i64| c > i as i64 && (c as usize) < n;
            if !child_ok(left) || !child_ok(right) {
                return Err(format!("node {} has invalid children ({}, {})", i, left, right));
            }
            let feature = arrays.feature[i];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on unknown feature {}", i, feature));
            }
            let threshold = arrays.threshold[i];
            if !threshold.is_finite() {
                return Err(format!("node {} has a non-finite threshold", i));
            }

            nodes.push(Node::Split {
                feature: feature as usize,
                threshold,
                left: left as usize,
                right: right as usize,
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_distribution(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Forest of probability trees. Class probabilities are the mean of the
/// per-tree leaf distributions; the label is their argmax.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
}

impl ForestClassifier {
    pub fn from_trees(
        trees: Vec<TreeArrays>,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, LoadError> {
        if trees.is_empty() {
            return Err(LoadError::InvalidEstimator("random forest has no trees".to_string()));
        }

        let trees = trees
            .into_iter()
            .enumerate()
            .map(|(i, arrays)| {
                Tree::from_arrays(arrays, n_features, n_classes)
                    .map_err(|e| LoadError::InvalidEstimator(format!("tree {}: {}", i, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for ForestClassifier {
    fn classify(&self, features: &[f64]) -> Result<i64, ClassifierError> {
        let proba = self.score(features)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(EXPECTED_CLASSES[best])
    }

    fn score(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        check_input(features, self.n_features)?;

        let mut sums = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (sum, p) in sums.iter_mut().zip(tree.leaf_distribution(features)) {
                *sum += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sums.into_iter().map(|s| s / n).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

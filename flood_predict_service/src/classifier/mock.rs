//! Threshold stand-in for a trained model.
//!
//! Placeholder decision rule used in development when no artifact exists:
//! rainfall above 50 means flood likely at 0.85, anything else reports
//! 0.15. Same request and response contract as a real model.

use super::loader::LoadError;
use super::{check_input, Classifier, ClassifierError};
use crate::features::FeatureSchema;
use crate::model::{LABEL_FLOOD, LABEL_NO_FLOOD};

pub const MOCK_FIELD: &str = "rainfall";
pub const MOCK_THRESHOLD: f64 = 50.0;
pub const MOCK_FLOOD_PROBABILITY: f64 = 0.85;
pub const MOCK_CLEAR_PROBABILITY: f64 = 0.15;

#[derive(Debug, Clone)]
pub struct ThresholdClassifier {
    field_index: usize,
    n_features: usize,
}

impl ThresholdClassifier {
    /// Binds the rule to the rainfall position of `schema`.
    pub fn for_schema(schema: &FeatureSchema) -> Result<Self, LoadError> {
        let field_index = schema
            .index_of(MOCK_FIELD)
            .ok_or(LoadError::MockFieldMissing {
                field: MOCK_FIELD,
                schema: schema.name,
            })?;

        Ok(Self {
            field_index,
            n_features: schema.len(),
        })
    }

    fn is_flood(&self, features: &[f64]) -> Result<bool, ClassifierError> {
        check_input(features, self.n_features)?;
        Ok(features[self.field_index] > MOCK_THRESHOLD)
    }
}

impl Classifier for ThresholdClassifier {
    fn classify(&self, features: &[f64]) -> Result<i64, ClassifierError> {
        Ok(if self.is_flood(features)? { LABEL_FLOOD } else { LABEL_NO_FLOOD })
    }

    fn score(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        let p = if self.is_flood(features)? {
            MOCK_FLOOD_PROBABILITY
        } else {
            MOCK_CLEAR_PROBABILITY
        };
        Ok(vec![1.0 - p, p])
    }
}

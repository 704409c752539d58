//! Prediction handler: one request body in, one response out.
//!
//! Steps, in order:
//! 1. Refuse immediately with 503 if no classifier is bound.
//! 2. Build the feature vector from the body per the active schema.
//! 3. Ask the classifier for a label and a class distribution.
//! 4. Map label 1 / 0 to its literal and round the positive probability.
//!
//! Failures in 2 and 3 share one bucket (500). A missing model is kept
//! separate (503) since it is a deployment problem, not a request problem.

use crate::classifier::loader::{self, LoadError, ModelSlot};
use crate::classifier::{Classifier, ClassifierError};
use crate::config::ServiceConfig;
use crate::features::{FeatureError, FeatureSchema, FeatureVector};
use crate::model::{round_to, PredictionResponse, ResponseLabels, POSITIVE_CLASS_INDEX};
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Request(#[from] FeatureError),

    #[error(transparent)]
    Inference(#[from] ClassifierError),

    #[error("classifier returned unexpected label {0}")]
    UnexpectedLabel(i64),

    #[error("classifier returned {0} class probabilities, expected 2")]
    ClassCount(usize),

    #[error("positive-class probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f64),
}

impl PredictError {
    pub fn status_code(&self) -> u16 {
        match self {
            PredictError::Unavailable(_) => 503,
            _ => 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

/// Everything `/predict` needs, fixed at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Predictor {
    schema: &'static FeatureSchema,
    model: ModelSlot,
    labels: ResponseLabels,
    precision: u32,
}

impl Predictor {
    pub fn new(
        schema: &'static FeatureSchema,
        model: ModelSlot,
        labels: ResponseLabels,
        precision: u32,
    ) -> Self {
        Self {
            schema,
            model,
            labels,
            precision,
        }
    }

    /// Loads the configured backend under the configured policy. Only the
    /// fail-fast policy can return an error here.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, LoadError> {
        let schema = config.schema();
        let model = loader::load_with_policy(&config.model, schema)?;
        Ok(Self::new(
            schema,
            model,
            ResponseLabels::new(config.negative_label()),
            config.prediction.precision,
        ))
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    pub fn model(&self) -> &ModelSlot {
        &self.model
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_ready()
    }

    /// Handles a raw `/predict` body.
    pub fn predict_body(&self, body: &[u8]) -> Result<PredictionResponse, PredictError> {
        let classifier = self.classifier()?;
        let features = self.schema.parse_body(body)?;
        self.infer(classifier, &features)
    }

    /// Handles an already-parsed body.
    pub fn predict_value(&self, body: &Value) -> Result<PredictionResponse, PredictError> {
        let classifier = self.classifier()?;
        let features = self.schema.extract(body)?;
        self.infer(classifier, &features)
    }

    fn classifier(&self) -> Result<&dyn Classifier, PredictError> {
        match &self.model {
            ModelSlot::Ready(model) => Ok(model.classifier.as_ref()),
            ModelSlot::Unavailable { reason } => Err(PredictError::Unavailable(reason.clone())),
        }
    }

    fn infer(
        &self,
        classifier: &dyn Classifier,
        features: &FeatureVector,
    ) -> Result<PredictionResponse, PredictError> {
        let label = classifier.classify(features.values())?;
        let distribution = classifier.score(features.values())?;

        if distribution.len() != 2 {
            return Err(PredictError::ClassCount(distribution.len()));
        }
        let probability = distribution[POSITIVE_CLASS_INDEX];
        if !(0.0..=1.0).contains(&probability) {
            return Err(PredictError::ProbabilityOutOfRange(probability));
        }

        let prediction = self
            .labels
            .for_label(label)
            .ok_or(PredictError::UnexpectedLabel(label))?;

        Ok(PredictionResponse {
            prediction: prediction.to_string(),
            probability: round_to(probability, self.precision),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

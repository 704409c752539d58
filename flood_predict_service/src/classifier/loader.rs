//! One-time classifier loading at process startup.
//!
//! Two failure policies are supported (see `LoadPolicy`):
//!
//! - **degraded** (default): log the failure and keep starting. The slot is
//!   left `Unavailable` and every prediction answers 503 until the process is
//!   restarted with a good artifact.
//! - **fail_fast**: return the error so the binary exits before binding.

use super::artifact::ModelArtifact;
use super::mock::ThresholdClassifier;
use super::Classifier;
use crate::config::{Backend, LoadPolicy, ModelSettings};
use crate::features::FeatureSchema;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{} is missing", .path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact features {found:?} do not match the '{schema}' schema {expected:?}")]
    FeatureMismatch {
        schema: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("artifact classes {found:?} do not match the expected binary order [0, 1]")]
    ClassMismatch { found: Vec<i64> },

    #[error("invalid estimator: {0}")]
    InvalidEstimator(String),

    #[error("mock backend needs a '{field}' field but schema '{schema}' has none")]
    MockFieldMissing {
        field: &'static str,
        schema: &'static str,
    },
}

/// A classifier ready to serve, plus what it was loaded from.
#[derive(Clone)]
pub struct LoadedModel {
    pub classifier: Arc<dyn Classifier>,
    /// Artifact path, or a description of the mock rule.
    pub source: String,
    pub kind: &'static str,
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("source", &self.source)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The process-wide model binding, fixed before the server starts.
#[derive(Debug, Clone)]
pub enum ModelSlot {
    Ready(LoadedModel),
    /// Degraded policy only. Holds the load failure for 503 messages.
    Unavailable { reason: String },
}

impl ModelSlot {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelSlot::Ready(_))
    }
}

/// Reads and validates a JSON artifact against `schema`.
pub fn load_artifact(path: &Path, schema: &FeatureSchema) -> Result<LoadedModel, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing {
            path: path.to_path_buf(),
        });
    }

    let json = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let artifact = ModelArtifact::from_json(&json).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let kind = artifact.kind();
    let classifier = artifact.into_classifier(schema)?;

    Ok(LoadedModel {
        classifier: Arc::from(classifier),
        source: path.display().to_string(),
        kind,
    })
}

/// Builds the configured backend without applying any failure policy.
pub fn load_model(settings: &ModelSettings, schema: &FeatureSchema) -> Result<LoadedModel, LoadError> {
    match settings.backend {
        Backend::Artifact => load_artifact(&settings.path, schema),
        Backend::Mock => {
            let mock = ThresholdClassifier::for_schema(schema)?;
            Ok(LoadedModel {
                classifier: Arc::new(mock),
                source: "mock threshold rule (rainfall > 50)".to_string(),
                kind: "mock",
            })
        }
    }
}

/// Loads the model and applies the configured failure policy. Emits exactly
/// one status line describing the outcome.
pub fn load_with_policy(
    settings: &ModelSettings,
    schema: &FeatureSchema,
) -> Result<ModelSlot, LoadError> {
    match load_model(settings, schema) {
        Ok(model) => {
            info!(
                source = %model.source,
                kind = model.kind,
                schema = schema.name,
                "Model loaded successfully"
            );
            Ok(ModelSlot::Ready(model))
        }
        Err(e) => match settings.load_policy {
            LoadPolicy::Degraded => {
                error!(
                    error = %e,
                    "CRITICAL: failed to load model; /predict will answer 503 until restart"
                );
                Ok(ModelSlot::Unavailable {
                    reason: e.to_string(),
                })
            }
            LoadPolicy::FailFast => {
                error!(error = %e, "CRITICAL: failed to load model; aborting startup");
                Err(e)
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Classifier seam between the prediction handler and whatever produced the
//! model.
//!
//! The handler only ever sees [`Classifier`]: a label operation and a
//! per-class probability operation. Concrete backends live in the
//! submodules:
//!
//! - `artifact`: JSON-exported logistic regression / random forest
//! - `mock`: rainfall threshold rule for development without a model
//! - `loader`: startup loading and the degraded / fail-fast policies

pub mod artifact;
pub mod loader;
pub mod mock;

pub use loader::{LoadError, LoadedModel, ModelSlot};

use thiserror::Error;

/// A trained binary flood classifier.
///
/// Implementations are immutable after construction and shared by every
/// request worker, hence `Send + Sync`.
pub trait Classifier: Send + Sync {
    /// Discrete class label for one feature vector (0 = no flood, 1 = flood).
    fn classify(&self, features: &[f64]) -> Result<i64, ClassifierError>;

    /// Probability per class in `[negative, positive]` order.
    fn score(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError>;
}

/// Failure while running a loaded classifier on one vector.
#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    #[error("feature length mismatch: got {got}, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },

    #[error("feature {index} is not a finite number")]
    NonFinite { index: usize },
}

/// Shared input check for every backend.
pub(crate) fn check_input(features: &[f64], expected: usize) -> Result<(), ClassifierError> {
    if features.len() != expected {
        return Err(ClassifierError::DimensionMismatch {
            got: features.len(),
            expected,
        });
    }
    if let Some(index) = features.iter().position(|v| !v.is_finite()) {
        return Err(ClassifierError::NonFinite { index });
    }
    Ok(())
}

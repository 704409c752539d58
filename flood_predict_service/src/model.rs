//! Shared data types for the flood prediction service.
//!
//! The wire shapes returned by `/predict` live here so that the handler,
//! the HTTP layer and the offline `score_request` binary all agree on them.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Class labels and response literals
// ---------------------------------------------------------------------------

/// Classifier label for the negative class.
pub const LABEL_NO_FLOOD: i64 = 0;
/// Classifier label for the positive class.
pub const LABEL_FLOOD: i64 = 1;

/// Binary class order every loaded classifier must report: `[negative, positive]`.
pub const EXPECTED_CLASSES: [i64; 2] = [LABEL_NO_FLOOD, LABEL_FLOOD];

/// Index of the positive class in a per-class probability distribution.
pub const POSITIVE_CLASS_INDEX: usize = 1;

pub const FLOOD_LIKELY: &str = "Flood Likely";
pub const NO_FLOOD: &str = "No Flood";
/// Negative literal used by the mock threshold backend.
pub const NO_FLOOD_EXPECTED: &str = "No Flood Expected";

/// Decimal places kept in `probability` unless configured otherwise.
pub const DEFAULT_PRECISION: u32 = 3;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Successful `/predict` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub probability: f64,
}

/// Body of every failed request, regardless of status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Literal strings a label maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLabels {
    pub positive: String,
    pub negative: String,
}

impl ResponseLabels {
    pub fn new(negative: impl Into<String>) -> Self {
        Self {
            positive: FLOOD_LIKELY.to_string(),
            negative: negative.into(),
        }
    }

    /// Maps a classifier label to its response literal. Labels outside the
    /// binary class set have no literal.
    pub fn for_label(&self, label: i64) -> Option<&str> {
        match label {
            LABEL_FLOOD => Some(&self.positive),
            LABEL_NO_FLOOD => Some(&self.negative),
            _ => None,
        }
    }
}

impl Default for ResponseLabels {
    fn default() -> Self {
        Self::new(NO_FLOOD)
    }
}

/// Rounds half away from zero to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

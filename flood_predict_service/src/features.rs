//! Feature schemas: the declared, ordered set of request fields a classifier
//! was trained on.
//!
//! A request body is an untyped JSON object. Each schema field is pulled out
//! by name, coerced to its numeric kind, and written into the feature vector
//! at the field's position. The position is the contract with the external
//! classifier: the artifact loader refuses any model whose declared feature
//! names differ from the active schema, so reordering a schema cannot slip
//! through silently.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Field declarations
// ---------------------------------------------------------------------------

/// Numeric type a field is coerced to before it enters the vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Float,
    /// Count-like fields (month). Fractional values are rejected.
    Integer,
}

impl FieldKind {
    fn type_name(self) -> &'static str {
        match self {
            FieldKind::Float => "float",
            FieldKind::Integer => "int",
        }
    }
}

/// One named input field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Value used when the field is absent. `None` makes the field required.
    pub default: Option<f64>,
}

/// An ordered list of fields matching a classifier's training layout.
#[derive(Debug, PartialEq)]
pub struct FeatureSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

/// rainfall, temperature, humidity, elevation, month. All optional.
#[rustfmt::skip]
pub static ENVIRONMENTAL: FeatureSchema = FeatureSchema {
    name: "environmental",
    fields: &[
        FieldSpec { name: "rainfall", kind: FieldKind::Float, default: Some(0.0) },
        FieldSpec { name: "temperature", kind: FieldKind::Float, default: Some(0.0) },
        FieldSpec { name: "humidity", kind: FieldKind::Float, default: Some(0.0) },
        FieldSpec { name: "elevation", kind: FieldKind::Float, default: Some(0.0) },
        FieldSpec { name: "month", kind: FieldKind::Integer, default: Some(1.0) },
    ],
};

/// rainfall, river_level, temperature, humidity. All required.
#[rustfmt::skip]
pub static RIVER_LEVEL: FeatureSchema = FeatureSchema {
    name: "river_level",
    fields: &[
        FieldSpec { name: "rainfall", kind: FieldKind::Float, default: None },
        FieldSpec { name: "river_level", kind: FieldKind::Float, default: None },
        FieldSpec { name: "temperature", kind: FieldKind::Float, default: None },
        FieldSpec { name: "humidity", kind: FieldKind::Float, default: None },
    ],
};

/// Config-facing selector for the built-in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaName {
    #[default]
    Environmental,
    RiverLevel,
}

impl SchemaName {
    pub fn schema(self) -> &'static FeatureSchema {
        match self {
            SchemaName::Environmental => &ENVIRONMENTAL,
            SchemaName::RiverLevel => &RIVER_LEVEL,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("request body must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' could not be converted to {expected}: {found}")]
    NotNumeric {
        field: &'static str,
        expected: &'static str,
        found: String,
    },
}

// ---------------------------------------------------------------------------
// Feature vector
// ---------------------------------------------------------------------------

/// Values in schema order, ready for a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

impl FeatureSchema {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Parses a raw request body. An empty or whitespace-only body is the
    /// same as `{}`, so every defaulted field takes its default.
    pub fn parse_body(&self, body: &[u8]) -> Result<FeatureVector, FeatureError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return self.extract(&Value::Object(serde_json::Map::new()));
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| FeatureError::InvalidJson(e.to_string()))?;
        self.extract(&value)
    }

    /// Builds the feature vector from a JSON object. Unknown keys are ignored.
    pub fn extract(&self, body: &Value) -> Result<FeatureVector, FeatureError> {
        let object = body
            .as_object()
            .ok_or_else(|| FeatureError::NotAnObject(json_type_name(body)))?;

        let mut values = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let value = match object.get(field.name) {
                Some(raw) => coerce(field, raw)?,
                None => field
                    .default
                    .ok_or(FeatureError::MissingField(field.name))?,
            };
            values.push(value);
        }

        Ok(FeatureVector { values })
    }
}

/// Lax numeric coercion: JSON numbers and numeric strings pass, anything
/// else (null, booleans, containers, words) fails.
fn coerce(field: &FieldSpec, raw: &Value) -> Result<f64, FeatureError> {
    let coerced = match (field.kind, raw) {
        (FieldKind::Float, Value::Number(n)) => n.as_f64(),
        (FieldKind::Float, Value::String(s)) => s.trim().parse::<f64>().ok(),
        (FieldKind::Integer, Value::Number(n)) => n
            .as_i64()
            .map(|i| i as f64)
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0)),
        (FieldKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(|i| i as f64),
        _ => None,
    };

    coerced
        .filter(|v| v.is_finite())
        .ok_or_else(|| FeatureError::NotNumeric {
            field: field.name,
            expected: field.kind.type_name(),
            found: raw.to_string(),
        })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Service configuration loader - parses predict_service.toml
//!
//! Keeps deployment knobs (bind address, artifact path, load policy, feature
//! schema) out of the code. Precedence, lowest to highest: built-in
//! defaults, the TOML file, environment variables (a `.env` file is honored),
//! then command-line flags applied by the binary.

use crate::features::{FeatureSchema, SchemaName};
use crate::model::{DEFAULT_PRECISION, NO_FLOOD, NO_FLOOD_EXPECTED};
use crate::weather::OPEN_METEO_BASE_URL;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "predict_service.toml";
/// Artifact path resolved relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "model.json";

const MAX_PRECISION: u32 = 6;

// ---------------------------------------------------------------------------
// Configuration structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub prediction: PredictionSettings,
    pub weather: WeatherSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Request-handling threads pulling from the shared listener.
    pub workers: usize,
    /// Logs raw `/predict` payloads at debug level.
    pub debug: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: 4,
            debug: false,
        }
    }
}

/// Which classifier backs `/predict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// JSON classifier artifact read from `model.path`.
    #[default]
    Artifact,
    /// Rainfall threshold rule, no artifact needed.
    Mock,
}

/// What happens at startup when the model cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Keep serving; `/predict` answers 503.
    #[default]
    Degraded,
    /// Abort startup.
    FailFast,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    pub path: PathBuf,
    pub backend: Backend,
    pub load_policy: LoadPolicy,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            backend: Backend::default(),
            load_policy: LoadPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictionSettings {
    pub schema: SchemaName,
    /// Decimal places kept in `probability`.
    pub precision: u32,
    /// Overrides the negative literal. Defaults depend on the backend.
    pub negative_label: Option<String>,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            schema: SchemaName::default(),
            precision: DEFAULT_PRECISION,
            negative_label: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherSettings {
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: OPEN_METEO_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
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
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl ServiceConfig {
    /// Loads configuration from `path`, or from `predict_service.toml` in the
    /// working directory when no path is given.
    ///
    /// An explicitly requested file must exist. The default file is optional:
    /// if it is absent, built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !required && !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config: ServiceConfig =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string (used by tests and tools).
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `FLOOD_*` environment overrides, loading `.env` first.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        dotenv::dotenv().ok();
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup. Recognized keys:
    /// `FLOOD_HOST`, `FLOOD_PORT`, `FLOOD_MODEL_PATH`, `FLOOD_DEBUG`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("FLOOD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("FLOOD_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| invalid("FLOOD_PORT", format!("'{}' is not a port number", port)))?;
        }
        if let Some(path) = lookup("FLOOD_MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(debug) = lookup("FLOOD_DEBUG") {
            self.server.debug = match debug.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => return Err(invalid("FLOOD_DEBUG", format!("'{}' is not a boolean", other))),
            };
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host", "must not be empty"));
        }
        if self.server.workers == 0 {
            return Err(invalid("server.workers", "must be at least 1"));
        }
        if self.prediction.precision > MAX_PRECISION {
            return Err(invalid(
                "prediction.precision",
                format!("{} exceeds the maximum of {}", self.prediction.precision, MAX_PRECISION),
            ));
        }
        if let Some(label) = &self.prediction.negative_label {
            if label.trim().is_empty() {
                return Err(invalid("prediction.negative_label", "must not be empty"));
            }
        }
        if self.weather.enabled && self.weather.base_url.trim().is_empty() {
            return Err(invalid("weather.base_url", "must not be empty when weather is enabled"));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        self.prediction.schema.schema()
    }

    /// Negative literal: the configured one, else "No Flood" for a real
    /// model and "No Flood Expected" for the mock rule.
    pub fn negative_label(&self) -> &str {
        match (&self.prediction.negative_label, self.model.backend) {
            (Some(label), _) => label.as_str(),
            (None, Backend::Artifact) => NO_FLOOD,
            (None, Backend::Mock) => NO_FLOOD_EXPECTED,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

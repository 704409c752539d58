/// flood_predict_service: flood risk classification over HTTP.
///
/// # Module structure
///
/// ```text
/// flood_predict_service
/// ├── model       — response types, label literals, probability rounding
/// ├── features    — input schemas and lax JSON-to-vector coercion
/// ├── config      — predict_service.toml + FLOOD_* environment overrides
/// ├── classifier
/// │   ├── artifact — JSON classifier artifacts (logistic regression, forest)
/// │   ├── mock     — rainfall threshold rule
/// │   └── loader   — startup loading under the degraded / fail-fast policy
/// ├── predict     — request → features → classifier → response
/// ├── weather     — Open-Meteo passthrough and request autofill
/// ├── endpoint    — tiny_http routing and worker threads
/// └── fixtures (test only) — classifier artifacts and upstream payloads
/// ```

/// Public modules
pub mod classifier;
pub mod config;
pub mod endpoint;
pub mod features;
pub mod model;
pub mod predict;
pub mod weather;

#[cfg(test)]
mod fixtures;

//! Test fixtures: classifier artifacts and upstream payloads.
//!
//! Artifacts are hand-sized so expected probabilities can be worked out by
//! hand in the tests that use them.

/// Logistic regression over the environmental schema. Only rainfall has
/// weight: `z = 0.05 * rainfall - 2.5`, so rainfall 50 is the 0.5 boundary.
pub(crate) fn logistic_artifact_json() -> &'static str {
    r#"{
      "feature_names": ["rainfall", "temperature", "humidity", "elevation", "month"],
      "classes": [0, 1],
      "estimator": {
        "type": "logistic_regression",
        "coefficients": [0.05, 0.0, 0.0, 0.0, 0.0],
        "intercept": -2.5
      }
    }"#
}

/// Two stumps over the environmental schema.
///
/// Tree 1 splits rainfall at 50: left leaf [4, 0], right leaf [1, 3].
/// Tree 2 splits humidity at 80: left leaf [3, 1], right leaf [0, 5].
pub(crate) fn forest_artifact_json() -> &'static str {
    r#"{
      "feature_names": ["rainfall", "temperature", "humidity", "elevation", "month"],
      "classes": [0, 1],
      "estimator": {
        "type": "random_forest",
        "trees": [
          {
            "children_left":  [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature":        [0, -2, -2],
            "threshold":      [50.0, -2.0, -2.0],
            "value":          [[5.0, 3.0], [4.0, 0.0], [1.0, 3.0]]
          },
          {
            "children_left":  [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature":        [2, -2, -2],
            "threshold":      [80.0, -2.0, -2.0],
            "value":          [[3.0, 6.0], [3.0, 1.0], [0.0, 5.0]]
          }
        ]
      }
    }"#
}

/// Trimmed Open-Meteo forecast response (current + daily, past_days=7).
pub(crate) fn open_meteo_forecast_json() -> &'static str {
    r#"{
      "latitude": 12.98,
      "longitude": 77.58,
      "timezone": "Asia/Kolkata",
      "current_units": {
        "time": "iso8601",
        "temperature_2m": "°C",
        "relative_humidity_2m": "%",
        "precipitation": "mm"
      },
      "current": {
        "time": "2026-07-14T10:15",
        "interval": 900,
        "temperature_2m": 24.3,
        "relative_humidity_2m": 88,
        "precipitation": 3.2
      },
      "daily": {
        "time": ["2026-07-07", "2026-07-08"],
        "precipitation_sum": [12.4, 30.1],
        "temperature_2m_max": [28.1, 26.7],
        "relative_humidity_2m_mean": [81, 90]
      }
    }"#
}

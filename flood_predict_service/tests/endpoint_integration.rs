/// Integration tests for the HTTP endpoint
///
/// Each test binds a real listener on an OS-assigned port, serves it from a
/// background thread and talks to it over HTTP:
/// 1. Artifact-backed predictions
/// 2. Degraded startup (missing artifact answers 503)
/// 3. Mock threshold rule
/// 4. Health, placeholder and unknown routes
/// 5. Weather passthrough against a local forecast stub
///
/// No network access beyond loopback is needed.
///
/// Run with: cargo test --test endpoint_integration

use flood_predict_service::config::{Backend, LoadPolicy, ServiceConfig};
use flood_predict_service::endpoint::{self, EndpointContext};
use flood_predict_service::predict::Predictor;
use flood_predict_service::weather::WeatherClient;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Starts a server for `config` and returns its base URL.
fn spawn_server(config: &ServiceConfig) -> String {
    spawn_server_with_weather(config, None)
}

fn spawn_server_with_weather(config: &ServiceConfig, weather: Option<WeatherClient>) -> String {
    let predictor = Predictor::from_config(config).expect("degraded policy never fails");
    let context = EndpointContext::new(predictor, weather, false);

    let server = endpoint::bind("127.0.0.1:0").expect("bind loopback");
    let port = server
        .server_addr()
        .to_ip()
        .expect("TCP listener")
        .port();

    thread::spawn(move || {
        let _ = endpoint::serve(server, context, 2);
    });

    format!("http://127.0.0.1:{}", port)
}

/// Stands in for Open-Meteo: answers every request with `forecast` and
/// hands the requested URL back through the returned channel.
fn spawn_forecast_stub(forecast: Value) -> (String, mpsc::Receiver<String>) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind stub");
    let port = server.server_addr().to_ip().expect("TCP listener").port();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for request in server.incoming_requests() {
            let _ = tx.send(request.url().to_string());
            let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .unwrap();
            let response = tiny_http::Response::from_string(forecast.to_string()).with_header(header);
            let _ = request.respond(response);
        }
    });

    (format!("http://127.0.0.1:{}", port), rx)
}

fn base_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.weather.enabled = false;
    config
}

/// Logistic artifact with zero weights: every request scores
/// sigmoid(ln 11.5) = 11.5 / 12.5 = 0.92.
fn write_constant_artifact(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("model.json");
    let artifact = json!({
        "feature_names": ["rainfall", "temperature", "humidity", "elevation", "month"],
        "classes": [0, 1],
        "estimator": {
            "type": "logistic_regression",
            "coefficients": [0.0, 0.0, 0.0, 0.0, 0.0],
            "intercept": 11.5_f64.ln()
        }
    });
    fs::write(&path, artifact.to_string()).unwrap();
    path
}

fn post_predict(base: &str, body: &str) -> (u16, Value) {
    let response = reqwest::blocking::Client::new()
        .post(format!("{}/predict", base))
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .expect("request should reach the server");
    let status = response.status().as_u16();
    let json: Value = response.json().expect("JSON body");
    (status, json)
}

// ---------------------------------------------------------------------------
// 1. Artifact-backed predictions
// ---------------------------------------------------------------------------

#[test]
fn test_artifact_prediction_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    config.model.path = write_constant_artifact(dir.path());

    let base = spawn_server(&config);
    let (status, body) = post_predict(
        &base,
        r#"{"rainfall": 12.5, "temperature": "28", "humidity": 80, "elevation": 10, "month": 7}"#,
    );

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "prediction": "Flood Likely", "probability": 0.92 }));
}

#[test]
fn test_malformed_body_is_500_with_error_field() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    config.model.path = write_constant_artifact(dir.path());

    let base = spawn_server(&config);
    let (status, body) = post_predict(&base, "{not json");

    assert_eq!(status, 500);
    assert!(body["error"].is_string());
    assert!(body.get("prediction").is_none());
}

// ---------------------------------------------------------------------------
// 2. Degraded startup
// ---------------------------------------------------------------------------

#[test]
fn test_missing_artifact_answers_503() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    config.model.path = dir.path().join("absent.json");
    config.model.load_policy = LoadPolicy::Degraded;

    let base = spawn_server(&config);
    let (status, body) = post_predict(&base, r#"{"rainfall": 80}"#);

    assert_eq!(status, 503);
    assert!(body["error"].as_str().unwrap().starts_with("model unavailable"));

    let health: Value = reqwest::blocking::get(format!("{}/health", base))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["model_loaded"], false);
}

#[test]
fn test_missing_artifact_fails_fast_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    config.model.path = dir.path().join("absent.json");
    config.model.load_policy = LoadPolicy::FailFast;

    assert!(Predictor::from_config(&config).is_err());
}

// ---------------------------------------------------------------------------
// 3. Mock threshold rule
// ---------------------------------------------------------------------------

#[test]
fn test_mock_rule_over_http() {
    let mut config = base_config();
    config.model.backend = Backend::Mock;
    let base = spawn_server(&config);

    let (status, body) = post_predict(&base, r#"{"rainfall": 75}"#);
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "prediction": "Flood Likely", "probability": 0.85 }));

    let (_, body) = post_predict(&base, r#"{"rainfall": 50}"#);
    assert_eq!(body, json!({ "prediction": "No Flood Expected", "probability": 0.15 }));

    let (status, body) = post_predict(&base, "{}");
    assert_eq!(status, 200);
    assert_eq!(body["prediction"], "No Flood Expected");
}

// ---------------------------------------------------------------------------
// 4. Other routes
// ---------------------------------------------------------------------------

#[test]
fn test_health_placeholder_and_unknown_routes() {
    let mut config = base_config();
    config.model.backend = Backend::Mock;
    let base = spawn_server(&config);

    let root = reqwest::blocking::get(format!("{}/", base)).unwrap();
    assert_eq!(root.status().as_u16(), 200);
    assert!(root.text().unwrap().contains("/predict"));

    let health: Value = reqwest::blocking::get(format!("{}/health", base))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "flood_predict_service");
    assert_eq!(health["model_kind"], "mock");

    let missing = reqwest::blocking::get(format!("{}/zones", base)).unwrap();
    assert_eq!(missing.status().as_u16(), 404);
    let body: Value = missing.json().unwrap();
    assert!(body["available_endpoints"].as_array().unwrap().len() >= 3);

    let wrong_method = reqwest::blocking::get(format!("{}/predict", base)).unwrap();
    assert_eq!(wrong_method.status().as_u16(), 405);

    let weather = reqwest::blocking::get(format!("{}/api/weather?lat=1&lon=2", base)).unwrap();
    assert_eq!(weather.status().as_u16(), 404);
}

// ---------------------------------------------------------------------------
// 5. Weather passthrough
// ---------------------------------------------------------------------------

#[test]
fn test_weather_passthrough_returns_upstream_json() {
    let forecast = json!({
        "latitude": 40.69,
        "longitude": -89.59,
        "current": { "temperature_2m": 18.4, "relative_humidity_2m": 91, "precipitation": 6.5 },
        "daily": { "time": ["2026-04-01"], "precipitation_sum": [41.0] }
    });
    let (stub_url, requested) = spawn_forecast_stub(forecast.clone());

    let mut config = base_config();
    config.model.backend = Backend::Mock;
    config.weather.enabled = true;
    config.weather.base_url = stub_url;
    let client = WeatherClient::new(&config.weather).unwrap();
    let base = spawn_server_with_weather(&config, Some(client));

    let response = reqwest::blocking::get(format!("{}/api/weather?lat=40.69&lon=-89.59", base)).unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().unwrap();
    assert_eq!(body, forecast, "upstream JSON must pass through unchanged");

    let upstream_url = requested.recv().unwrap();
    assert!(upstream_url.starts_with("/v1/forecast?latitude=40.69&longitude=-89.59"));
    assert!(upstream_url.contains("past_days=7"));
}

#[test]
fn test_weather_without_coordinates_is_400() {
    let (stub_url, _requested) = spawn_forecast_stub(json!({}));

    let mut config = base_config();
    config.model.backend = Backend::Mock;
    config.weather.base_url = stub_url;
    let client = WeatherClient::new(&config.weather).unwrap();
    let base = spawn_server_with_weather(&config, Some(client));

    let response = reqwest::blocking::get(format!("{}/api/weather?lat=40.69", base)).unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().unwrap();
    assert_eq!(body["error"], "Latitude and longitude are required query parameters.");
}

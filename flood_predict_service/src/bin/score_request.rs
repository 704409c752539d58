#!/usr/bin/env rust
//! Offline Request Scoring
//!
//! Runs one `/predict` body through the configured model without starting
//! the server. Useful for checking a freshly exported artifact before
//! deploying it. A load failure always aborts here, whatever the
//! configured policy says.
//!
//! Usage:
//!   cargo run --bin score_request -- request.json
//!   echo '{"rainfall": 72}' | cargo run --bin score_request
//!   cargo run --bin score_request -- --config prod.toml request.json
//!
//! Prints the JSON response the server would send, with its status code.
//! Exits 0 on a 200 response and 2 otherwise.

use clap::Parser;
use flood_predict_service::config::{Backend, LoadPolicy, ServiceConfig};
use flood_predict_service::model::ErrorResponse;
use flood_predict_service::predict::Predictor;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "score_request", about = "Score one prediction request offline")]
struct Args {
    /// JSON request body; reads stdin when omitted
    body: Option<PathBuf>,

    /// TOML config file (default: predict_service.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use the rainfall threshold rule instead of the artifact
    #[arg(long)]
    mock: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    config.apply_env()?;
    let config = scoring_config(config, args.mock);

    let predictor = Predictor::from_config(&config).unwrap_or_else(|e| {
        eprintln!("\n❌ Model load failed: {}\n", e);
        std::process::exit(1);
    });

    let body = read_body(args.body.as_deref(), io::stdin())?;
    let (status, json) = score(&predictor, &body)?;

    println!("HTTP {}", status);
    println!("{}", json);

    let code = exit_code(status);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Offline scoring never degrades: a model that fails to load is fatal.
fn scoring_config(mut config: ServiceConfig, mock: bool) -> ServiceConfig {
    config.model.load_policy = LoadPolicy::FailFast;
    if mock {
        config.model.backend = Backend::Mock;
    }
    config
}

fn read_body<R: Read>(path: Option<&Path>, mut stdin: R) -> io::Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path),
        None => {
            let mut buf = Vec::new();
            stdin.read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Status code and pretty-printed body, exactly as `/predict` would answer.
fn score(predictor: &Predictor, body: &[u8]) -> Result<(u16, String), serde_json::Error> {
    match predictor.predict_body(body) {
        Ok(response) => Ok((200, serde_json::to_string_pretty(&response)?)),
        Err(e) => Ok((
            e.status_code(),
            serde_json::to_string_pretty(&ErrorResponse::new(e.to_string()))?,
        )),
    }
}

fn exit_code(status: u16) -> i32 {
    if status == 200 { 0 } else { 2 }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::Cursor;

    fn mock_predictor() -> Predictor {
        let config = scoring_config(ServiceConfig::default(), true);
        Predictor::from_config(&config).unwrap()
    }

    #[test]
    fn test_scoring_config_forces_fail_fast() {
        let mut config = ServiceConfig::default();
        config.model.load_policy = LoadPolicy::Degraded;
        let config = scoring_config(config, false);
        assert_eq!(config.model.load_policy, LoadPolicy::FailFast);
        assert_eq!(config.model.backend, Backend::Artifact);
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.model.path = dir.path().join("absent.json");
        let config = scoring_config(config, false);

        assert!(
            Predictor::from_config(&config).is_err(),
            "offline scoring must not fall back to a degraded predictor"
        );
    }

    #[test]
    fn test_read_body_from_file_and_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, br#"{"rainfall": 72}"#).unwrap();

        let from_file = read_body(Some(path.as_path()), Cursor::new(b"ignored".to_vec())).unwrap();
        assert_eq!(from_file, br#"{"rainfall": 72}"#);

        let from_stdin = read_body(None, Cursor::new(br#"{"rainfall": 3}"#.to_vec())).unwrap();
        assert_eq!(from_stdin, br#"{"rainfall": 3}"#);
    }

    #[test]
    fn test_score_success_matches_endpoint_body() {
        let (status, body) = score(&mock_predictor(), br#"{"rainfall": 72}"#).unwrap();
        assert_eq!(status, 200);
        assert_eq!(exit_code(status), 0);

        let body: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body, json!({ "prediction": "Flood Likely", "probability": 0.85 }));
    }

    #[test]
    fn test_score_failure_exits_nonzero() {
        let (status, body) = score(&mock_predictor(), br#"{"rainfall": "heavy"}"#).unwrap();
        assert_eq!(status, 500);
        assert_eq!(exit_code(status), 2);

        let body: Value = serde_json::from_str(&body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("rainfall"));
    }
}

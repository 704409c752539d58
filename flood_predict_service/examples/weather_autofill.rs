/// Example: Fetch current Open-Meteo conditions and score them
///
/// Usage:
///   cargo run --example weather_autofill -- <lat> <lon> [elevation_m]
///
/// Fills rainfall, temperature and humidity from the forecast's `current`
/// block, adds elevation and the current month, then runs the request
/// through the mock threshold rule so no artifact is needed.
/// Shows:
///   - The raw current conditions
///   - The assembled /predict body
///   - The prediction the service would return

use chrono::{Datelike, Utc};
use flood_predict_service::config::{Backend, ServiceConfig};
use flood_predict_service::predict::Predictor;
use flood_predict_service::weather::{self, CurrentConditions, WeatherClient};
use serde_json::Value;
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [elevation_m]", args[0]);
        eprintln!();
        eprintln!("Example (Bengaluru):");
        eprintln!("  cargo run --example weather_autofill -- 12.97 77.59 920");
        std::process::exit(1);
    }

    let query = format!("lat={}&lon={}", args[1], args[2]);
    let (lat, lon) = match weather::parse_coordinates(&query) {
        Ok(coords) => coords,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    let elevation: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.0);

    let mut config = ServiceConfig::default();
    config.model.backend = Backend::Mock;

    let client = match WeatherClient::new(&config.weather) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("❌ Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    println!("🌦️  Fetching conditions for ({}, {})...", lat, lon);
    let forecast = match client.fetch_forecast(lat, lon) {
        Ok(forecast) => forecast,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let current = match CurrentConditions::from_forecast(&forecast) {
        Ok(current) => current,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    println!("   Temperature: {:?} °C", current.temperature_2m);
    println!("   Humidity:    {:?} %", current.relative_humidity_2m);
    println!("   Rainfall:    {:?} mm", current.precipitation);

    let mut fields = current.to_request_fields();
    fields.insert("elevation".to_string(), Value::from(elevation));
    fields.insert("month".to_string(), Value::from(Utc::now().month()));
    let body = Value::Object(fields);
    println!("\n📨 Request body: {}", body);

    let predictor = match Predictor::from_config(&config) {
        Ok(predictor) => predictor,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    match predictor.predict_value(&body) {
        Ok(response) => println!(
            "\n✓ {} (probability {})",
            response.prediction, response.probability
        ),
        Err(e) => eprintln!("\n❌ Prediction failed: {}", e),
    }
}

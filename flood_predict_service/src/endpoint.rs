//! HTTP endpoint for flood predictions
//!
//! Endpoints:
//! - POST /predict     - Classify one set of environmental readings
//! - GET  /            - Plaintext service placeholder
//! - GET  /health      - Service and model status
//! - GET  /api/weather - Open-Meteo passthrough for pre-filling requests
//!
//! Routing is a pure function of (method, url, body) so it can be tested
//! without sockets; the tiny_http layer only reads bodies and writes
//! responses. Several worker threads pull from one listener and share the
//! read-only context.

use crate::classifier::ModelSlot;
use crate::model::ErrorResponse;
use crate::predict::Predictor;
use crate::weather::{self, WeatherClient};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

const SERVICE_NAME: &str = "flood_predict_service";
const PLACEHOLDER_TEXT: &str =
    "Flood prediction service is running. POST environmental readings as JSON to /predict.";

// ---------------------------------------------------------------------------
// Context and errors
// ---------------------------------------------------------------------------

/// Shared, read-only state handed to every worker.
pub struct EndpointContext {
    predictor: Predictor,
    weather: Option<WeatherClient>,
    debug: bool,
    started_at: DateTime<Utc>,
}

impl EndpointContext {
    pub fn new(predictor: Predictor, weather: Option<WeatherClient>, debug: bool) -> Self {
        Self {
            predictor,
            weather,
            debug,
            started_at: Utc::now(),
        }
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Failed to start HTTP server on {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Worker thread {0} panicked")]
    WorkerPanicked(usize),
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    Text(String),
}

/// A routed response before it is turned into bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: ReplyBody,
}

impl Reply {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: ReplyBody::Json(body),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        let body = serde_json::to_value(ErrorResponse::new(message))
            .unwrap_or_else(|_| json!({ "error": "internal error" }));
        Self::json(status, body)
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: ReplyBody::Text(body.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes one request. Never panics; every path yields a JSON or text reply.
pub fn route(context: &EndpointContext, method: &Method, url: &str, body: &[u8]) -> Reply {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    match (method, path) {
        (Method::Post, "/predict") => handle_predict(context, body),
        (Method::Get, "/") => Reply::text(200, PLACEHOLDER_TEXT),
        (Method::Get, "/health") => handle_health(context),
        (Method::Get, "/api/weather") => handle_weather(context, query),
        (_, "/predict") | (_, "/") | (_, "/health") | (_, "/api/weather") => Reply::error(
            405,
            format!("Method {} not allowed for {}", method, path),
        ),
        _ => Reply::json(
            404,
            json!({
                "error": "Not found",
                "available_endpoints": ["POST /predict", "GET /", "GET /health", "GET /api/weather"]
            }),
        ),
    }
}

/// Handle POST /predict
fn handle_predict(context: &EndpointContext, body: &[u8]) -> Reply {
    if context.debug {
        debug!(payload = %String::from_utf8_lossy(body), "Received /predict payload");
    }

    match context.predictor.predict_body(body) {
        Ok(response) => match serde_json::to_value(&response) {
            Ok(value) => Reply::json(200, value),
            Err(e) => Reply::error(500, e.to_string()),
        },
        Err(e) => {
            let status = e.status_code();
            if status == 503 {
                warn!(error = %e, "Rejected /predict: model unavailable");
            } else {
                warn!(error = %e, "Prediction failed");
            }
            Reply::error(status, e.to_string())
        }
    }
}

/// Handle GET /health
fn handle_health(context: &EndpointContext) -> Reply {
    let predictor = &context.predictor;
    let (model_source, model_kind) = match predictor.model() {
        ModelSlot::Ready(model) => (Value::from(model.source.clone()), Value::from(model.kind)),
        ModelSlot::Unavailable { .. } => (Value::Null, Value::Null),
    };
    let now = Utc::now();

    Reply::json(
        200,
        json!({
            "status": if predictor.is_ready() { "ok" } else { "degraded" },
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "model_loaded": predictor.is_ready(),
            "model_source": model_source,
            "model_kind": model_kind,
            "schema": predictor.schema().name,
            "features": predictor.schema().field_names(),
            "started_at": context.started_at.to_rfc3339(),
            "uptime_seconds": (now - context.started_at).num_seconds(),
        }),
    )
}

/// Handle GET /api/weather?lat=..&lon=..
fn handle_weather(context: &EndpointContext, query: &str) -> Reply {
    let Some(client) = &context.weather else {
        return Reply::error(404, "Weather passthrough is disabled");
    };

    let (lat, lon) = match weather::parse_coordinates(query) {
        Ok(coords) => coords,
        Err(e) => return Reply::error(e.status_code(), e.to_string()),
    };

    match client.fetch_forecast(lat, lon) {
        Ok(forecast) => Reply::json(200, forecast),
        Err(e) => {
            error!(error = %e, lat, lon, "Error fetching from Open-Meteo");
            Reply::error(500, "Failed to fetch external weather data.")
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Bind the listener. Use port 0 to let the OS pick one.
pub fn bind(addr: &str) -> Result<Server, EndpointError> {
    Server::http(addr).map_err(|e| EndpointError::Bind {
        addr: addr.to_string(),
        message: e.to_string(),
    })
}

/// Serve requests on `server` with `workers` threads until the listener
/// closes. Blocks the calling thread.
pub fn serve(server: Server, context: EndpointContext, workers: usize) -> Result<(), EndpointError> {
    let server = Arc::new(server);
    let context = Arc::new(context);

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers.max(1) {
        let server = Arc::clone(&server);
        let context = Arc::clone(&context);
        let handle = thread::Builder::new()
            .name(format!("predict-worker-{}", worker))
            .spawn(move || {
                for request in server.incoming_requests() {
                    handle_request(&context, request);
                }
            })?;
        handles.push(handle);
    }

    for (worker, handle) in handles.into_iter().enumerate() {
        handle
            .join()
            .map_err(|_| EndpointError::WorkerPanicked(worker))?;
    }

    Ok(())
}

/// Bind to `addr` and serve forever.
pub fn start_endpoint_server(
    addr: &str,
    context: EndpointContext,
    workers: usize,
) -> Result<(), EndpointError> {
    let server = bind(addr)?;

    info!(addr, workers, "HTTP endpoint listening");
    println!("📡 HTTP endpoint listening on http://{}", addr);
    println!("   POST /predict     - Flood prediction");
    println!("   GET  /health      - Service health check");
    println!("   GET  /api/weather - Current conditions (lat, lon)\n");

    serve(server, context, workers)
}

fn handle_request(context: &EndpointContext, mut request: Request) {
    let mut body = Vec::new();
    let reply = match request.as_reader().read_to_end(&mut body) {
        Ok(_) => route(context, request.method(), request.url(), &body),
        Err(e) => Reply::error(500, format!("Failed to read request body: {}", e)),
    };

    debug!(method = %request.method(), url = request.url(), status = reply.status, "Handled request");

    if let Err(e) = request.respond(create_response(reply)) {
        warn!(error = %e, "Failed to send response");
    }
}

/// Create HTTP response with a JSON or plaintext body
fn create_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let (bytes, content_type): (Vec<u8>, &[u8]) = match reply.body {
        ReplyBody::Json(value) => (
            serde_json::to_vec(&value).unwrap_or_default(),
            b"application/json",
        ),
        ReplyBody::Text(text) => (text.into_bytes(), b"text/plain; charset=utf-8"),
    };

    let response = Response::from_data(bytes).with_status_code(StatusCode(reply.status));
    match Header::from_bytes(&b"Content-Type"[..], content_type) {
        Ok(header) => response.with_header(header),
        Err(_) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

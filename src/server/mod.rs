//! HTTP boundary for the summarizer.
//!
//! - `POST /` and `POST /summarize` - summarize a transcript
//! - `OPTIONS` - CORS preflight, answers `ok`
//! - anything else - `405 Method not allowed`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::header::{ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::settings::RecapConfig;
use crate::error::{RecapError, Result};
use crate::llm::build_provider;
use crate::summarizer::{Summarizer, SummaryLength, SummaryOptions};

#[derive(Clone)]
pub struct AppState {
    pub summarizer: Arc<Summarizer>,
    /// Cancelled on shutdown; each request runs on a child token
    pub shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
struct SummarizeRequest {
    #[serde(default)]
    transcript: Option<serde_json::Value>,
    #[serde(default)]
    length: Option<SummaryLength>,
    #[serde(default, rename = "actionItems")]
    action_items: Option<bool>,
}

#[derive(Debug, Serialize)]
struct SummarizeResponse {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for RecapError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            RecapError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
            RecapError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Transcript too long".to_string(),
            ),
            RecapError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            _ => {
                tracing::error!("Summarization failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Stamp the fixed CORS headers on every response, preflight included.
async fn cors_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

pub fn create_router(state: AppState) -> Router {
    let summarize: MethodRouter<AppState> = post(summarize_handler)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/", summarize.clone())
        .route("/summarize", summarize)
        .with_state(state)
        .layer(middleware::from_fn(cors_headers))
        .layer(TraceLayer::new_for_http())
}

async fn preflight() -> &'static str {
    "ok"
}

async fn method_not_allowed() -> (StatusCode, &'static str) {
    (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn summarize_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SummarizeResponse>> {
    // Parsed regardless of Content-Type.
    let body: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| RecapError::InvalidInput(format!("Invalid JSON body: {}", e)))?;
    let (transcript, options) = parse_request(body)?;

    let cancel = state.shutdown.child_token();
    let summary = state
        .summarizer
        .summarize(&transcript, options, &cancel)
        .await?;

    Ok(Json(SummarizeResponse {
        summary: summary.text,
        cached: summary.cached.then_some(true),
    }))
}

fn parse_request(body: serde_json::Value) -> Result<(String, SummaryOptions)> {
    let request: SummarizeRequest = serde_json::from_value(body)
        .map_err(|e| RecapError::InvalidInput(format!("Invalid request: {}", e)))?;

    let transcript = match request.transcript {
        Some(serde_json::Value::String(text)) if !text.is_empty() => text,
        _ => return Err(RecapError::InvalidInput("Transcript required".to_string())),
    };

    let defaults = SummaryOptions::default();
    let options = SummaryOptions {
        length: request.length.unwrap_or(defaults.length),
        action_items: request.action_items.unwrap_or(defaults.action_items),
    };

    Ok((transcript, options))
}

/// Serve until Ctrl-C; in-flight summaries are cancelled on shutdown.
pub async fn run_server(config: &RecapConfig, bind: Option<&str>) -> Result<()> {
    let provider = build_provider(&config.llm, &config.retry)?;
    let summarizer = Arc::new(Summarizer::new(provider, &config.summarizer)?);
    let shutdown = CancellationToken::new();

    let app = create_router(AppState {
        summarizer,
        shutdown: shutdown.clone(),
    });

    let bind = bind.unwrap_or(&config.server.bind);
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| RecapError::Config(format!("Invalid bind address {}: {}", bind, e)))?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    tracing::info!("Shutting down, cancelling in-flight summaries");
    shutdown.cancel();
}

//! Probe and info endpoints
//!
//! - `/health` - Liveness: process is up, with uptime and pod identity
//! - `/ready` - Readiness: always ready, there are no downstream dependencies
//! - `/info` - Application and runtime metadata
//! - `/` - Human-readable landing page that refreshes every 5 seconds

use crate::clock::{Clock, ProcessClock};
use crate::config::Config;
use axum::{
    extract::State,
    http::{header::ALLOW, Method, StatusCode, Uri},
    middleware::map_response,
    response::{Html, Response},
    routing::get,
    Json, Router,
};
use chrono::SecondsFormat;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Application name reported by `/info`
pub const APP_NAME: &str = "demo-apps";

/// Application version reported by `/info`
pub const APP_VERSION: &str = "v1.0.0";

/// Landing page refresh interval in seconds
pub const REFRESH_INTERVAL_SECS: u32 = 5;

const GREETING: &str = "Hello from CI/CD Demo App - SPSI - xyz 12121212121212";

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
}

impl AppState {
    /// Create state for a process that started at `started`
    pub fn new(config: Config, started: Instant) -> Self {
        Self::with_clock(config, Arc::new(ProcessClock::started_at(started)))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            clock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyStatus {
    Ready,
}

/// Body of `/health`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub uptime: f64,
    pub pod: String,
    pub namespace: String,
}

/// Body of `/ready`
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: ReadyStatus,
}

/// Body of `/info`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub app: &'static str,
    pub version: &'static str,
    pub node_env: String,
    pub pod: String,
    pub namespace: String,
}

/// Liveness probe handler
async fn health(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: HealthStatus::Healthy,
        timestamp: state
            .clock
            .now()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime: state.clock.uptime().as_secs_f64(),
        pod: state.config.pod_name.clone(),
        namespace: state.config.namespace.clone(),
    })
}

/// Readiness probe handler
///
/// A dependency check belongs here. An unreachable dependency should answer
/// 503 so the orchestrator stops routing traffic instead of restarting us.
async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: ReadyStatus::Ready,
    })
}

async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        app: APP_NAME,
        version: APP_VERSION,
        node_env: state.config.node_env.clone(),
        pod: state.config.pod_name.clone(),
        namespace: state.config.namespace.clone(),
    })
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.config))
}

async fn not_found(method: Method, uri: Uri) -> StatusCode {
    debug!(%method, %uri, "No route matched");
    StatusCode::NOT_FOUND
}

/// A method mismatch is answered as 404, so the `Allow` header axum attaches
/// to it must not leak out.
async fn strip_allow_on_not_found(mut response: Response) -> Response {
    if response.status() == StatusCode::NOT_FOUND {
        response.headers_mut().remove(ALLOW);
    }
    response
}

/// Render the landing page
pub fn render_index(config: &Config) -> String {
    format!(
        r#"<html>
  <head>
    <meta http-equiv="refresh" content="{refresh}">
    <title>CI/CD Demo</title>
    <style>
      body {{ font-family: Arial, sans-serif; margin: 40px; }}
      .info {{ background: #f0f0f0; padding: 20px; border-radius: 8px; }}
    </style>
  </head>
  <body>
    <h1>{greeting}</h1>
    <div class="info">
      <p><strong>Pod:</strong> {pod}</p>
      <p><strong>Namespace:</strong> {namespace}</p>
      <p><strong>Node Env:</strong> {node_env}</p>
    </div>
    <p>Page reloads every {refresh} seconds.</p>
    <p><a href="/health">Health Check</a> | <a href="/info">App Info</a></p>
  </body>
</html>
"#,
        refresh = REFRESH_INTERVAL_SECS,
        greeting = GREETING,
        pod = escape_html(&config.pod_name),
        namespace = escape_html(&config.namespace),
        node_env = escape_html(&config.node_env),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Build the router for the four service routes
///
/// Unknown paths and unsupported methods on known paths both answer 404.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/info", get(info))
        .route("/", get(index))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(map_response(strip_allow_on_not_found))
        .with_state(state)
}

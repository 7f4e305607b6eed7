//! HTTP API server for the runbridge daemon.
//!
//! Exposes run-configuration control and log access for local tools over a
//! loopback-only REST API.
//!
//! ## Endpoints
//!
//! ### Projects & Run Configurations
//! - `GET /projects` - List served project scopes
//! - `GET /run-configs` - List run configurations with status
//! - `GET /run-configs/{name}` - Get configuration details
//! - `POST /run-configs/{name}/{action}` - Dispatch run|debug|stop|restart
//!
//! ### Log Access
//! - `GET /run-configs/{name}/logs` - Enumerate log sources
//! - `GET /run-configs/{name}/logs/{source}` - Read a line window
//! - `GET /run-configs/{name}/logs/{source}/tail` - Read the last N lines
//! - `GET /run-configs/{name}/logs/{source}/search` - Substring search
//!
//! ### Observability
//! - `GET /metrics` - Prometheus metrics
//!
//! ### System
//! - `GET /health` - Health check
//! - `GET /version` - Version info
//!
//! Endpoints taking an optional `project` query parameter address that scope
//! by name; without it the first (default) scope is used.
//!
//! ## Authentication
//!
//! Every request except `/health` and `/metrics` must carry the
//! per-installation bearer token:
//!
//! ```bash
//! curl -H "Authorization: Bearer $(runbridge token)" \
//!     http://127.0.0.1:7420/run-configs
//! ```
//!
//! The server only ever binds to 127.0.0.1; the token authorizes local
//! callers, it is not a substitute for network isolation.

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use subtle::ConstantTimeEq;

use crate::logging;
use crate::metrics;
use crate::scope::ScopeSet;

pub mod handlers;
pub mod types;


use handlers::{
    get_config, health, list_configs, list_projects, list_sources, read_source, run_action,
    search_source, tail_source, version,
};

/// Shared application state for HTTP handlers.
pub(crate) struct AppState {
    pub(crate) scopes: ScopeSet,
    pub(crate) token: String,
    pub(crate) started_at: Instant,
}

pub(crate) type SharedState = Arc<AppState>;

/// Builds the API router with auth and metrics layers applied.
pub(crate) fn build_router(state: SharedState) -> Router {
    Router::new()
        // Projects and run configurations
        .route("/projects", get(list_projects))
        .route("/run-configs", get(list_configs))
        .route("/run-configs/{name}", get(get_config))
        .route("/run-configs/{name}/{action}", post(run_action))
        // Log access
        .route("/run-configs/{name}/logs", get(list_sources))
        .route("/run-configs/{name}/logs/{source}", get(read_source))
        .route("/run-configs/{name}/logs/{source}/tail", get(tail_source))
        .route(
            "/run-configs/{name}/logs/{source}/search",
            get(search_source),
        )
        // Observability
        .route("/metrics", get(metrics_endpoint))
        // System endpoints
        .route("/health", get(health))
        .route("/version", get(version))
        .with_state(Arc::clone(&state))
        // Bearer token authentication (exempts /health and /metrics)
        .layer(middleware::from_fn_with_state(state, bearer_auth_middleware))
        // Metrics middleware - records HTTP request metrics
        .layer(middleware::from_fn(metrics_middleware))
}

/// Starts the HTTP API server on the loopback interface.
///
/// Serves until a shutdown signal arrives, then stops every tracked process
/// before returning. See module-level documentation for endpoint details.
pub async fn serve(scopes: ScopeSet, token: String, port: u16) -> Result<()> {
    let _metrics_handle = metrics::init_metrics();
    tracing::info!("Prometheus metrics initialized");

    let state = Arc::new(AppState {
        scopes,
        token,
        started_at: Instant::now(),
    });

    // Keep a handle for post-serve teardown
    let shutdown_state = Arc::clone(&state);

    let app = build_router(state);

    // Loopback only: the API authorizes local tools, never remote hosts.
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));

    tracing::info!("Starting runbridge HTTP API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    // Graceful shutdown: stop all tracked processes
    shutdown_state.scopes.shutdown_all().await;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping daemon...");
}

/// Middleware enforcing bearer token authentication.
///
/// `/health` and `/metrics` are exempt so probes and Prometheus scraping
/// keep working without the token.
async fn bearer_auth_middleware(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if path == "/health" || path == "/metrics" {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if token_matches(token, &state.token) => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %path, "Bearer authentication failed: invalid token");
            crate::error::Error::Auth("invalid bearer token".to_string()).into_response()
        },
        None => {
            tracing::warn!(path = %path, "Bearer authentication failed: missing header");
            crate::error::Error::Auth("missing bearer token".to_string()).into_response()
        },
    }
}

/// Compares tokens without leaking the mismatch position through timing.
fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Middleware to record HTTP request metrics.
async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();

    metrics::record_http_request(&method, &path, status, duration.as_secs_f64());
    logging::log_request_complete(
        &method,
        &path,
        status,
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    );

    response
}

/// GET /metrics - Prometheus metrics endpoint.
async fn metrics_endpoint() -> impl IntoResponse {
    let body = metrics::render_metrics();
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
}

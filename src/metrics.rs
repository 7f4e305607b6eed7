//! Prometheus metrics for the runbridge daemon.
//!
//! Metrics are exposed at `GET /metrics` in Prometheus text format.
//!
//! # Metrics Exposed
//!
//! - `runbridge_http_requests_total` - Total HTTP requests (labels: method, path, status)
//! - `runbridge_http_request_duration_seconds` - Request duration histogram
//! - `runbridge_actions_total` - Dispatched actions (labels: action, outcome)
//! - `runbridge_tracked_processes` - Currently tracked processes (labels: scope)

#![allow(clippy::cast_precision_loss)]

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initializes the metrics system.
///
/// Must be called once at startup before recording any metrics.
/// Returns the Prometheus handle for rendering metrics.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_metrics();

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    handle
}

/// Gets the global Prometheus handle.
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Registers all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "runbridge_http_requests_total",
        "Total number of HTTP requests"
    );
    describe_histogram!(
        "runbridge_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "runbridge_actions_total",
        "Total run-configuration actions dispatched"
    );
    describe_gauge!(
        "runbridge_tracked_processes",
        "Number of currently tracked processes per scope"
    );
}

/// Records an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();

    counter!(
        "runbridge_http_requests_total",
        "method" => method.to_string(),
        "path" => normalize_path(path),
        "status" => status_str
    )
    .increment(1);

    histogram!(
        "runbridge_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalize_path(path)
    )
    .record(duration_secs);
}

/// Records a dispatched action and its outcome.
pub fn record_action(action: &str, outcome: &str) {
    counter!(
        "runbridge_actions_total",
        "action" => action.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Sets the tracked-process gauge for a scope.
pub fn set_tracked_processes(scope: &str, count: usize) {
    gauge!(
        "runbridge_tracked_processes",
        "scope" => scope.to_string()
    )
    .set(count as f64);
}

/// Normalizes a path for metrics (replaces variable segments).
///
/// Configuration and source names are caller-chosen and unbounded, so they
/// are collapsed to placeholders to keep label cardinality flat.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<String> = path
        .trim_start_matches('/')
        .split('/')
        .map(str::to_string)
        .collect();

    if segments.first().is_some_and(|s| s == "run-configs") {
        if segments.len() >= 2 {
            segments[1] = ":name".to_string();
        }
        if segments.get(2).is_some_and(|s| s == "logs") && segments.len() >= 4 {
            segments[3] = ":source".to_string();
        }
    }

    format!("/{}", segments.join("/"))
}

/// Renders all metrics in Prometheus text format.
pub fn render_metrics() -> String {
    match get_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/run-configs"), "/run-configs");
        assert_eq!(normalize_path("/run-configs/app"), "/run-configs/:name");
        assert_eq!(
            normalize_path("/run-configs/app/restart"),
            "/run-configs/:name/restart"
        );
        assert_eq!(
            normalize_path("/run-configs/app/logs"),
            "/run-configs/:name/logs"
        );
        assert_eq!(
            normalize_path("/run-configs/app/logs/console"),
            "/run-configs/:name/logs/:source"
        );
        assert_eq!(
            normalize_path("/run-configs/app/logs/app.log/tail"),
            "/run-configs/:name/logs/:source/tail"
        );
        assert_eq!(
            normalize_path("/run-configs/app/logs/app.log/search"),
            "/run-configs/:name/logs/:source/search"
        );
    }

    #[test]
    fn test_normalize_path_preserves_fixed_routes() {
        assert_eq!(normalize_path("/projects"), "/projects");
        assert_eq!(normalize_path("/version"), "/version");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }
}

//! HTTP handlers for the runbridge API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::SharedState;
use super::types::{
    ConfigDetail, ConfigListResponse, ConfigSummary, HealthResponse, ProjectInfo, ProjectQuery,
    ProjectsResponse, ReadQuery, SearchQuery, SourcesResponse, TailQuery, VersionResponse,
};
use crate::dispatch::Action;
use crate::error::Error;
use crate::logs::{self, LogContent, SearchResponse};
use crate::manifest::CAPABILITIES;
use crate::metrics;
use crate::scope::Scope;

/// GET /projects - List served project scopes.
pub(crate) async fn list_projects(State(state): State<SharedState>) -> Json<ProjectsResponse> {
    let projects = state
        .scopes
        .scopes()
        .iter()
        .enumerate()
        .map(|(i, scope)| ProjectInfo {
            name: scope.name().to_string(),
            root: scope.root().display().to_string(),
            default: i == 0,
        })
        .collect();

    Json(ProjectsResponse { projects })
}

/// GET /run-configs - List run configurations with their current status.
pub(crate) async fn list_configs(
    State(state): State<SharedState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<ConfigListResponse>, Error> {
    let scope = state.scopes.resolve(query.project.as_deref())?;

    let configs = scope
        .manifest()
        .configs
        .iter()
        .map(|config| ConfigSummary {
            name: config.name.clone(),
            kind: config.kind.clone(),
            status: scope.registry().status(&config.name),
        })
        .collect();

    Ok(Json(ConfigListResponse { configs }))
}

/// GET /run-configs/:name - Get configuration details.
pub(crate) async fn get_config(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<ConfigDetail>, Error> {
    let scope = state.scopes.resolve(query.project.as_deref())?;
    let config = scope
        .manifest()
        .get(&name)
        .ok_or_else(|| Error::NotFound(format!("Run configuration '{name}' not found")))?;

    let tracked = scope.registry().lookup(&name);

    Ok(Json(ConfigDetail {
        name: config.name.clone(),
        kind: config.kind.clone(),
        status: scope.registry().status(&name),
        capabilities: CAPABILITIES.iter().map(|c| (*c).to_string()).collect(),
        pid: tracked.as_ref().and_then(|t| t.handle.pid()),
        started_at: tracked
            .as_ref()
            .map(|t| t.started_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        debug: tracked.as_ref().map(|t| t.debug),
    }))
}

/// POST /run-configs/:name/:action - Dispatch an action.
///
/// A failed action is a 400 carrying the ActionResult body, not the uniform
/// error body; the caller distinguishes the two by the `state` field.
pub(crate) async fn run_action(
    State(state): State<SharedState>,
    Path((name, action)): Path<(String, String)>,
    Query(query): Query<ProjectQuery>,
) -> Result<Response, Error> {
    let scope = state.scopes.resolve(query.project.as_deref())?;

    let action = Action::parse(&action).ok_or_else(|| {
        Error::Validation(format!(
            "Unknown action '{action}' (expected run, debug, stop, or restart)"
        ))
    })?;

    let config = scope
        .manifest()
        .get(&name)
        .ok_or_else(|| Error::NotFound(format!("Run configuration '{name}' not found")))?;

    let result = scope.dispatcher().dispatch(config, action).await;
    metrics::record_action(action.as_str(), if result.is_ok() { "ok" } else { "error" });

    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(result)).into_response())
}

/// GET /run-configs/:name/logs - Enumerate log sources.
pub(crate) async fn list_sources(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<SourcesResponse>, Error> {
    let scope = state.scopes.resolve(query.project.as_deref())?;
    ensure_config(&scope, &name)?;

    let sources = logs::enumerate(scope.root(), scope.registry(), &name)
        .into_iter()
        .map(|source| source.info)
        .collect();

    Ok(Json(SourcesResponse { sources }))
}

/// GET /run-configs/:name/logs/:source - Read a line window.
pub(crate) async fn read_source(
    State(state): State<SharedState>,
    Path((name, source)): Path<(String, String)>,
    Query(query): Query<ReadQuery>,
) -> Result<Json<LogContent>, Error> {
    let scope = state.scopes.resolve(query.project.as_deref())?;
    ensure_config(&scope, &name)?;
    let found = resolve_source(&scope, &name, &source)?;

    Ok(Json(logs::reader::read(&found, query.offset, query.limit)))
}

/// GET /run-configs/:name/logs/:source/tail - Read the last N lines.
pub(crate) async fn tail_source(
    State(state): State<SharedState>,
    Path((name, source)): Path<(String, String)>,
    Query(query): Query<TailQuery>,
) -> Result<Json<LogContent>, Error> {
    let scope = state.scopes.resolve(query.project.as_deref())?;
    ensure_config(&scope, &name)?;
    let found = resolve_source(&scope, &name, &source)?;

    Ok(Json(logs::reader::tail(&found, query.lines)))
}

/// GET /run-configs/:name/logs/:source/search - Substring search.
pub(crate) async fn search_source(
    State(state): State<SharedState>,
    Path((name, source)): Path<(String, String)>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, Error> {
    let scope = state.scopes.resolve(query.project.as_deref())?;
    ensure_config(&scope, &name)?;

    let q = query
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| Error::Validation("query parameter 'q' is required".to_string()))?;

    let found = resolve_source(&scope, &name, &source)?;

    Ok(Json(logs::reader::search(
        &found,
        &q,
        query.case_sensitive,
        query.max_results,
    )))
}

/// GET /health - Health check.
pub(crate) async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime: format_uptime(state.started_at.elapsed()),
    })
}

/// GET /version - Version info.
pub(crate) async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: "release".to_string(),
    })
}

fn ensure_config(scope: &Scope, name: &str) -> Result<(), Error> {
    if scope.manifest().get(name).is_none() {
        return Err(Error::NotFound(format!(
            "Run configuration '{name}' not found"
        )));
    }
    Ok(())
}

fn resolve_source(
    scope: &Scope,
    name: &str,
    source: &str,
) -> Result<logs::EnumeratedSource, Error> {
    logs::resolve(scope.root(), scope.registry(), name, source).ok_or_else(|| {
        Error::NotFound(format!("Log source '{source}' not found for '{name}'"))
    })
}

fn format_uptime(uptime: std::time::Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

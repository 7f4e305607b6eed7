//! Request and response types for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::logs::LogSource;
use crate::registry::RunStatus;

/// One served project scope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub root: String,
    /// True for the scope used when no `project` parameter is given.
    pub default: bool,
}

/// Response containing the served project scopes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectInfo>,
}

/// Summary of one run configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: RunStatus,
}

/// Response containing a scope's run configurations.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigListResponse {
    pub configs: Vec<ConfigSummary>,
}

/// Full details of one run configuration.
///
/// `pid`, `startedAt`, and `debug` are present only while a process is
/// tracked for the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDetail {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: RunStatus,
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

/// Response containing the log sources of a run configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct SourcesResponse {
    pub sources: Vec<LogSource>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime: String,
}

/// Version response.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub build: String,
}

/// Scope selector shared by endpoints without other parameters.
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub project: Option<String>,
}

/// Query parameters for reading a window of a log source.
#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub project: Option<String>,
}

/// Query parameters for tailing a log source.
#[derive(Debug, Deserialize)]
pub struct TailQuery {
    #[serde(default = "default_limit")]
    pub lines: usize,
    pub project: Option<String>,
}

/// Query parameters for searching a log source.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Substring to search for (required).
    pub q: Option<String>,
    #[serde(default, rename = "caseSensitive")]
    pub case_sensitive: bool,
    #[serde(default = "default_max_results", rename = "maxResults")]
    pub max_results: usize,
    pub project: Option<String>,
}

fn default_limit() -> usize {
    100
}

fn default_max_results() -> usize {
    100
}

//! runbridge.toml project manifest.
//!
//! Each served project root carries a `runbridge.toml` declaring its named
//! run configurations. Manifests are loaded once when a scope is created and
//! stay immutable for the scope's lifetime.
//!
//! # Example
//!
//! ```toml
//! [project]
//! name = "demo"
//!
//! [[config]]
//! name = "app"
//! type = "cargo"
//! command = "cargo"
//! args = ["run", "--quiet"]
//! cwd = "."
//! env = { RUST_LOG = "info" }
//!
//! [config.debug]
//! args = ["run", "--features", "debug-hooks"]
//! env = { RUST_BACKTRACE = "1" }
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Manifest file name expected at each project root.
pub const MANIFEST_FILE: &str = "runbridge.toml";

/// The capabilities every run configuration supports.
pub const CAPABILITIES: [&str; 4] = ["run", "debug", "stop", "restart"];

/// A project manifest (runbridge.toml).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// Project metadata.
    #[serde(default)]
    pub project: Project,
    /// Declared run configurations, in manifest order.
    #[serde(default, rename = "config")]
    pub configs: Vec<RunConfig>,
}

/// Project metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    /// Project name; defaults to the root directory name when omitted.
    #[serde(default)]
    pub name: Option<String>,
}

/// A single named run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Unique name within the manifest.
    pub name: String,
    /// Free-form type label (e.g. "cargo", "npm", "shell").
    #[serde(default = "default_kind", rename = "type")]
    pub kind: String,
    /// Program to execute.
    pub command: String,
    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory, relative to the project root when not absolute.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Optional overrides applied when launching in debug mode.
    #[serde(default)]
    pub debug: Option<DebugOverrides>,
}

/// Overrides applied when a configuration is launched in debug mode.
///
/// Omitted fields fall back to the base configuration; `env` entries are
/// merged over the base environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebugOverrides {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_kind() -> String {
    "command".to_string()
}

impl Manifest {
    /// Load the manifest from a project root.
    ///
    /// A missing manifest file yields an empty manifest (a valid project
    /// with zero run configurations). A malformed file is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "No manifest found, project has no run configurations"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest from {}", path.display()))?;

        let manifest: Manifest = toml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest from {}", path.display()))?;

        manifest.validate()?;

        tracing::info!(
            path = %path.display(),
            configs = manifest.configs.len(),
            "Loaded project manifest"
        );

        Ok(manifest)
    }

    /// Look up a run configuration by name.
    pub fn get(&self, name: &str) -> Option<&RunConfig> {
        self.configs.iter().find(|c| c.name == name)
    }

    /// Project name, falling back to the root directory name.
    pub fn project_name(&self, root: &Path) -> String {
        self.project
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| {
                root.file_name()
                    .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().to_string())
            })
    }

    /// Reject empty names/commands and duplicate configuration names.
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for config in &self.configs {
            if config.name.trim().is_empty() {
                bail!("run configuration with empty name");
            }
            if config.command.trim().is_empty() {
                bail!("run configuration '{}' has an empty command", config.name);
            }
            if !seen.insert(config.name.as_str()) {
                bail!("duplicate run configuration name '{}'", config.name);
            }
        }
        Ok(())
    }
}

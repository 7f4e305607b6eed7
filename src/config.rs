//! Global daemon configuration.
//!
//! Loads daemon-wide settings from `~/.runbridge/config.toml`.
//! Per-project run configurations live in `runbridge.toml` manifests
//! (see [`crate::manifest`]).
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! port = 7420
//!
//! [console]
//! max_lines = 10000
//!
//! [actions]
//! restart_grace_ms = 1500
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Global daemon configuration loaded from `~/.runbridge/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Console capture settings.
    pub console: ConsoleSettings,
    /// Action dispatch settings.
    pub actions: ActionSettings,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Port for the loopback HTTP API.
    pub port: u16,
}

/// Console capture settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Maximum output lines retained per launched process.
    pub max_lines: usize,
}

/// Action dispatch settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    /// Grace period between destroy and relaunch during a restart, in milliseconds.
    pub restart_grace_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 7420 }
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self { max_lines: 10_000 }
    }
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self {
            restart_grace_ms: 1500,
        }
    }
}

impl ActionSettings {
    /// Restart grace period as a [`Duration`].
    pub const fn restart_grace(&self) -> Duration {
        Duration::from_millis(self.restart_grace_ms)
    }
}

impl GlobalConfig {
    /// Load daemon configuration from `~/.runbridge/config.toml`.
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid, returns an error.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::debug!(
                path = %config_path.display(),
                "Daemon config not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path).with_context(|| {
            format!(
                "Failed to read daemon config from {}",
                config_path.display()
            )
        })?;

        let config: GlobalConfig = toml::from_str(&content).with_context(|| {
            format!(
                "Failed to parse daemon config from {}",
                config_path.display()
            )
        })?;

        tracing::info!(
            path = %config_path.display(),
            port = config.server.port,
            console_max_lines = config.console.max_lines,
            restart_grace_ms = config.actions.restart_grace_ms,
            "Loaded daemon configuration"
        );

        Ok(config)
    }

    /// Get the path to the daemon configuration file.
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".runbridge").join("config.toml"))
    }
}

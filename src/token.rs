//! Per-installation API token.
//!
//! The HTTP API requires a static bearer token on every request. The token
//! is generated once (UUID v4) and persisted at `~/.runbridge/token`; the
//! `RUNBRIDGE_TOKEN` environment variable overrides the persisted value.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable overriding the persisted token.
pub const TOKEN_ENV: &str = "RUNBRIDGE_TOKEN";

/// Load the API token, generating and persisting one if none exists.
pub fn load_or_create() -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.is_empty() {
            tracing::debug!("Using API token from {TOKEN_ENV}");
            return Ok(token);
        }
    }

    let path = token_path()?;
    if path.exists() {
        let token = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read token from {}", path.display()))?;
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    rotate()
}

/// Generate a fresh token and persist it, replacing any existing one.
pub fn rotate() -> Result<String> {
    let path = token_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let token = uuid::Uuid::new_v4().to_string();
    std::fs::write(&path, &token)
        .with_context(|| format!("Failed to write token to {}", path.display()))?;

    // Token file is a credential, keep it owner-readable only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    tracing::info!(path = %path.display(), "Generated new API token");
    Ok(token)
}

/// Path of the persisted token file.
pub fn token_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to get home directory")?;
    Ok(home.join(".runbridge").join("token"))
}

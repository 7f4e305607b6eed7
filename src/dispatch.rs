//! Action dispatch for run configurations.
//!
//! Maps the four actions onto the registry and the launcher. Launcher
//! failures are reported in the action result, never propagated; a failed
//! launch leaves the registry untouched.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::launcher::{LaunchMode, Launcher};
use crate::manifest::RunConfig;
use crate::registry::{ProcessRegistry, RunStatus};

/// An action requested on a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Run,
    Debug,
    Stop,
    Restart,
}

impl Action {
    /// Parses an action name as it appears in request paths.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "run" => Some(Self::Run),
            "debug" => Some(Self::Debug),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            _ => None,
        }
    }

    /// Lowercase wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Debug => "debug",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

/// Outcome tag of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    Error,
}

/// Result of dispatching an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    pub message: String,
    /// Resulting configuration state, or `"error"` when the launcher failed.
    pub state: String,
}

impl ActionResult {
    fn ok(message: String, state: RunStatus) -> Self {
        Self {
            status: ActionStatus::Ok,
            message,
            state: state.as_str().to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            status: ActionStatus::Error,
            message,
            state: "error".to_string(),
        }
    }

    /// True when the action succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == ActionStatus::Ok
    }
}

/// Dispatches actions for one project scope.
pub struct ActionDispatcher {
    registry: Arc<ProcessRegistry>,
    launcher: Arc<dyn Launcher>,
    restart_grace: Duration,
}

impl ActionDispatcher {
    /// Creates a dispatcher over a scope's registry and launcher.
    pub fn new(
        registry: Arc<ProcessRegistry>,
        launcher: Arc<dyn Launcher>,
        restart_grace: Duration,
    ) -> Self {
        Self {
            registry,
            launcher,
            restart_grace,
        }
    }

    /// Executes an action and reports the outcome.
    pub async fn dispatch(&self, config: &RunConfig, action: Action) -> ActionResult {
        tracing::info!(config = %config.name, action = action.as_str(), "Dispatching action");

        match action {
            Action::Run => self.launch(config, LaunchMode::Run).await,
            Action::Debug => self.launch(config, LaunchMode::Debug).await,
            Action::Stop => self.stop(config),
            Action::Restart => self.restart(config).await,
        }
    }

    async fn launch(&self, config: &RunConfig, mode: LaunchMode) -> ActionResult {
        let state = match mode {
            LaunchMode::Run => RunStatus::Running,
            LaunchMode::Debug => RunStatus::Debugging,
        };

        match self.launcher.launch(config, mode).await {
            Ok(info) => {
                let pid = info.pid.map_or_else(String::new, |pid| format!(" (pid {pid})"));
                ActionResult::ok(format!("started '{}'{pid}", config.name), state)
            },
            Err(e) => {
                tracing::warn!(config = %config.name, error = %e, "Launch failed");
                ActionResult::error(format!("{e:#}"))
            },
        }
    }

    /// Stop is idempotent: an untracked or already-reaped configuration
    /// reports ok in the idle state.
    fn stop(&self, config: &RunConfig) -> ActionResult {
        match self.registry.lookup(&config.name) {
            Some(tracked) if !tracked.handle.is_terminated() => {
                tracked.handle.destroy();
                ActionResult::ok(
                    format!("stop requested for '{}'", config.name),
                    RunStatus::Stopping,
                )
            },
            _ => ActionResult::ok(
                format!("'{}' is not running", config.name),
                RunStatus::Idle,
            ),
        }
    }

    /// Restart destroys any live process, waits out the grace period, and
    /// launches fresh in normal mode. Without a live process it is plain run.
    async fn restart(&self, config: &RunConfig) -> ActionResult {
        if let Some(tracked) = self.registry.lookup(&config.name) {
            if !tracked.handle.is_terminated() {
                tracked.handle.destroy();
                tokio::time::sleep(self.restart_grace).await;
            }
        }
        self.launch(config, LaunchMode::Run).await
    }
}

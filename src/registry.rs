//! Per-scope process tracking and status resolution.
//!
//! The registry maps configuration names to tracked processes, at most one
//! entry per name. A relaunch under the same name replaces the entry; the
//! replaced process keeps running unmanaged, and its eventual exit event is
//! discarded by launch id. All mutation flows through the owning scope's
//! drain task, which applies [`LifecycleEvent`]s in channel order.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::console::ConsoleBuffer;
use crate::process::ProcessHandle;

/// Derived lifecycle state of a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// No tracked process.
    Idle,
    /// Tracked and alive, launched normally.
    Running,
    /// Tracked and alive, launched in debug mode.
    Debugging,
    /// Destruction requested, process not yet reaped.
    Stopping,
    /// Process reaped but the entry not yet removed.
    Finished,
}

impl RunStatus {
    /// Lowercase wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Debugging => "debugging",
            Self::Stopping => "stopping",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A launched process tracked under a configuration name.
#[derive(Debug, Clone)]
pub struct TrackedProcess {
    /// Configuration name the process was launched for.
    pub name: String,
    /// Monotonic id distinguishing this launch from earlier ones.
    pub launch_id: u64,
    /// Capability over the supervised child.
    pub handle: ProcessHandle,
    /// Whether the launch used debug mode.
    pub debug: bool,
    /// Console output captured for this launch.
    pub console: Arc<ConsoleBuffer>,
    /// Launch timestamp.
    pub started_at: DateTime<Utc>,
}

/// Lifecycle events applied to the registry by the scope's drain task.
#[derive(Debug)]
pub enum LifecycleEvent {
    /// A process was launched and should be tracked, replacing any
    /// previous entry under the same name.
    Started(TrackedProcess),
    /// A tracked process exited and was reaped.
    Exited { name: String, launch_id: u64 },
}

/// Registry of tracked processes for one project scope.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: RwLock<HashMap<String, TrackedProcess>>,
}

impl ProcessRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a lifecycle event. Called from the scope's drain task only.
    pub fn apply(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Started(tracked) => self.record(tracked),
            LifecycleEvent::Exited { name, launch_id } => self.remove(&name, launch_id),
        }
    }

    /// Tracks a launched process, replacing any previous entry for the name.
    pub fn record(&self, tracked: TrackedProcess) {
        let mut entries = self.entries.write();
        let replaced = entries.insert(tracked.name.clone(), tracked);
        if let Some(old) = replaced {
            tracing::debug!(
                config = %old.name,
                launch_id = old.launch_id,
                "Replaced tracked process"
            );
        }
    }

    /// Removes the entry for `name` if it still belongs to `launch_id`.
    ///
    /// A mismatched id means the entry was replaced by a newer launch and
    /// the exit event is stale; it is discarded.
    pub fn remove(&self, name: &str, launch_id: u64) {
        let mut entries = self.entries.write();
        match entries.get(name) {
            Some(tracked) if tracked.launch_id == launch_id => {
                entries.remove(name);
            },
            Some(tracked) => {
                tracing::debug!(
                    config = %name,
                    stale_launch_id = launch_id,
                    current_launch_id = tracked.launch_id,
                    "Discarded stale exit event"
                );
            },
            None => {},
        }
    }

    /// Returns the tracked process for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<TrackedProcess> {
        self.entries.read().get(name).cloned()
    }

    /// Names of all currently tracked processes, sorted.
    pub fn running_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of tracked processes.
    pub fn tracked_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Derives the status of a configuration name.
    ///
    /// Priority: stopping (destruction in flight) wins over everything,
    /// then finished (reaped but not yet removed), then the debug flag,
    /// then plain running. Untracked names are idle.
    pub fn status(&self, name: &str) -> RunStatus {
        let entries = self.entries.read();
        match entries.get(name) {
            None => RunStatus::Idle,
            Some(tracked) => {
                if tracked.handle.is_terminating() {
                    RunStatus::Stopping
                } else if tracked.handle.is_terminated() {
                    RunStatus::Finished
                } else if tracked.debug {
                    RunStatus::Debugging
                } else {
                    RunStatus::Running
                }
            },
        }
    }

    /// True when the name resolves to running or debugging.
    pub fn is_active(&self, name: &str) -> bool {
        matches!(
            self.status(name),
            RunStatus::Running | RunStatus::Debugging
        )
    }
}

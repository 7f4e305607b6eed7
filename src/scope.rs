//! Project scopes and the scope set served by one daemon.
//!
//! A scope binds a project root to its manifest, its process registry, and
//! the dispatcher acting on it. Each scope runs a single drain task that is
//! the only consumer of the scope's lifecycle channel, so events are applied
//! to the registry strictly in arrival order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::GlobalConfig;
use crate::dispatch::ActionDispatcher;
use crate::error::Error;
use crate::launcher::{CommandLauncher, Launcher};
use crate::manifest::Manifest;
use crate::metrics;
use crate::registry::ProcessRegistry;

/// How long teardown waits for monitors to reap destroyed processes.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// One served project directory.
pub struct Scope {
    name: String,
    root: PathBuf,
    manifest: Manifest,
    registry: Arc<ProcessRegistry>,
    dispatcher: ActionDispatcher,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Scope {
    /// Opens a project root: loads its manifest, creates the registry, and
    /// spawns the lifecycle drain task.
    pub fn open(root: &Path, config: &GlobalConfig) -> Result<Arc<Self>> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve project root {}", root.display()))?;

        let manifest = Manifest::load(&root)?;
        let name = manifest.project_name(&root);

        let registry = Arc::new(ProcessRegistry::new());
        let (events, mut rx) = mpsc::unbounded_channel();
        let launcher: Arc<dyn Launcher> = Arc::new(CommandLauncher::new(
            root.clone(),
            config.console.max_lines,
            events,
        ));

        let drain_registry = Arc::clone(&registry);
        let drain_scope = name.clone();
        let drain = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                drain_registry.apply(event);
                metrics::set_tracked_processes(&drain_scope, drain_registry.tracked_count());
            }
        });

        let dispatcher = ActionDispatcher::new(
            Arc::clone(&registry),
            launcher,
            config.actions.restart_grace(),
        );

        tracing::info!(
            project = %name,
            root = %root.display(),
            configs = manifest.configs.len(),
            "Opened project scope"
        );

        Ok(Arc::new(Self {
            name,
            root,
            manifest,
            registry,
            dispatcher,
            drain: Mutex::new(Some(drain)),
        }))
    }

    /// Project name shown in listings and used for scope selection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonicalized project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The scope's manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The scope's process registry.
    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// The scope's action dispatcher.
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Requests destruction of every tracked process, waits for monitors to
    /// reap them, then stops the drain task.
    pub async fn shutdown(&self) {
        let names = self.registry.running_names();
        if !names.is_empty() {
            tracing::info!(
                project = %self.name,
                count = names.len(),
                "Stopping tracked processes"
            );
            for name in &names {
                if let Some(tracked) = self.registry.lookup(name) {
                    tracked.handle.destroy();
                }
            }

            let deadline = tokio::time::Instant::now() + SHUTDOWN_TIMEOUT;
            while self.registry.tracked_count() > 0 && tokio::time::Instant::now() < deadline {
                tokio::time::sleep(SHUTDOWN_POLL).await;
            }

            let remaining = self.registry.tracked_count();
            if remaining > 0 {
                tracing::warn!(
                    project = %self.name,
                    remaining,
                    "Processes still tracked after shutdown grace"
                );
            }
        }

        if let Some(drain) = self.drain.lock().take() {
            drain.abort();
        }
    }
}

/// The ordered set of scopes served by one daemon. The first scope is the
/// default for requests that do not name a project.
#[derive(Debug, Default)]
pub struct ScopeSet {
    scopes: Vec<Arc<Scope>>,
}

impl ScopeSet {
    /// Builds a set from already-opened scopes.
    pub fn new(scopes: Vec<Arc<Scope>>) -> Self {
        Self { scopes }
    }

    /// Opens every root in order. Duplicate project names are a startup
    /// error since scope selection goes by name.
    pub fn open_all(roots: &[PathBuf], config: &GlobalConfig) -> Result<Self> {
        let mut scopes: Vec<Arc<Scope>> = Vec::with_capacity(roots.len());
        for root in roots {
            let scope = Scope::open(root, config)?;
            if scopes.iter().any(|s| s.name() == scope.name()) {
                bail!(
                    "duplicate project name '{}' (from {})",
                    scope.name(),
                    root.display()
                );
            }
            scopes.push(scope);
        }
        Ok(Self { scopes })
    }

    /// All scopes, in registration order.
    pub fn scopes(&self) -> &[Arc<Scope>] {
        &self.scopes
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Resolves the scope a request addresses.
    ///
    /// No `project` parameter selects the default (first) scope. An unknown
    /// name is a not-found error listing the valid names; an empty set is
    /// unavailable regardless of the parameter.
    pub fn resolve(&self, project: Option<&str>) -> Result<Arc<Scope>, Error> {
        if self.scopes.is_empty() {
            return Err(Error::Unavailable(
                "no project scope is available".to_string(),
            ));
        }

        match project {
            None => Ok(Arc::clone(&self.scopes[0])),
            Some(name) => self
                .scopes
                .iter()
                .find(|s| s.name() == name)
                .cloned()
                .ok_or_else(|| {
                    let valid: Vec<&str> = self.scopes.iter().map(|s| s.name()).collect();
                    Error::NotFound(format!(
                        "Unknown project '{name}'. Valid projects: {}",
                        valid.join(", ")
                    ))
                }),
        }
    }

    /// Shuts down every scope in order.
    pub async fn shutdown_all(&self) {
        for scope in &self.scopes {
            scope.shutdown().await;
        }
    }
}

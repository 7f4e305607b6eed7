//! Launch capability for run configurations.
//!
//! [`Launcher`] is the seam between the action dispatcher and the operating
//! system. The production [`CommandLauncher`] spawns the configured command
//! with piped output, wires reader tasks into a fresh console buffer, emits
//! the `Started` lifecycle event, and hands the child to a monitor task.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

use crate::console::ConsoleBuffer;
use crate::manifest::RunConfig;
use crate::process::{self, ProcessHandle};
use crate::registry::{LifecycleEvent, TrackedProcess};

/// How a configuration is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Plain launch.
    Run,
    /// Launch with the configuration's debug overrides applied.
    Debug,
}

/// Details of a successful launch.
#[derive(Debug, Clone)]
pub struct LaunchInfo {
    /// OS process id, when available.
    pub pid: Option<u32>,
    /// Id distinguishing this launch from earlier ones under the same name.
    pub launch_id: u64,
}

/// Capability to launch run configurations.
///
/// On success the launched process is already flowing through the scope's
/// lifecycle channel; callers never see the child itself.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, config: &RunConfig, mode: LaunchMode) -> Result<LaunchInfo>;
}

/// Launcher backed by `tokio::process`.
pub struct CommandLauncher {
    root: PathBuf,
    console_max_lines: usize,
    events: UnboundedSender<LifecycleEvent>,
    next_launch_id: AtomicU64,
}

impl CommandLauncher {
    /// Creates a launcher rooted at a project directory.
    pub fn new(
        root: PathBuf,
        console_max_lines: usize,
        events: UnboundedSender<LifecycleEvent>,
    ) -> Self {
        Self {
            root,
            console_max_lines,
            events,
            next_launch_id: AtomicU64::new(1),
        }
    }

    /// Working directory for a configuration, relative paths resolved
    /// against the project root.
    fn resolve_cwd(&self, config: &RunConfig) -> PathBuf {
        match &config.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            Some(cwd) => self.root.join(cwd),
            None => self.root.clone(),
        }
    }
}

#[async_trait]
impl Launcher for CommandLauncher {
    async fn launch(&self, config: &RunConfig, mode: LaunchMode) -> Result<LaunchInfo> {
        let is_debug = matches!(mode, LaunchMode::Debug);
        let overrides = if is_debug { config.debug.as_ref() } else { None };

        let program = overrides
            .and_then(|o| o.command.clone())
            .unwrap_or_else(|| config.command.clone());
        let args = overrides
            .and_then(|o| o.args.clone())
            .unwrap_or_else(|| config.args.clone());

        let mut command = Command::new(&program);
        command.args(&args);
        command.current_dir(self.resolve_cwd(config));
        command.envs(&config.env);
        if let Some(overrides) = overrides {
            command.envs(&overrides.env);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().with_context(|| {
            format!(
                "failed to spawn '{program}' for configuration '{}'",
                config.name
            )
        })?;

        let launch_id = self.next_launch_id.fetch_add(1, Ordering::Relaxed);
        let pid = child.id();
        let handle = ProcessHandle::new(pid);
        let console = Arc::new(ConsoleBuffer::new(self.console_max_lines));

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(read_stream(stdout, Arc::clone(&console)));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_stream(stderr, Arc::clone(&console)));
        }

        let tracked = TrackedProcess {
            name: config.name.clone(),
            launch_id,
            handle: handle.clone(),
            debug: is_debug,
            console,
            started_at: Utc::now(),
        };

        // Started is enqueued before the monitor exists, so the drain task
        // always records the entry before any exit event can remove it.
        if self.events.send(LifecycleEvent::Started(tracked)).is_err() {
            let _ = child.start_kill();
            bail!("scope is shutting down");
        }

        tracing::info!(
            config = %config.name,
            pid = ?pid,
            launch_id = launch_id,
            debug = is_debug,
            "Spawned process"
        );

        process::spawn_monitor(
            config.name.clone(),
            launch_id,
            child,
            handle,
            self.events.clone(),
        );

        Ok(LaunchInfo { pid, launch_id })
    }
}

/// Feeds one output stream into the console buffer, line by line.
async fn read_stream<R>(reader: R, console: Arc<ConsoleBuffer>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        console.push_line(line);
    }
}

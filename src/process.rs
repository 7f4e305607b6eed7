//! Child process supervision.
//!
//! Each launch hands its `tokio::process::Child` to a monitor task. The
//! monitor is the sole owner of the child: it waits for natural exit,
//! performs the graceful-then-forced kill when destruction is requested,
//! and emits exactly one `Exited` lifecycle event once the child is reaped.

use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedSender;

use crate::registry::LifecycleEvent;

/// Time allowed between SIGTERM and SIGKILL when destroying a process.
const TERM_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared capability over a supervised process.
///
/// Cloned into the registry entry. Exposes the termination flags and the
/// destruction request; the monitor task does the actual killing.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: Option<u32>,
    terminating: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    destroy: Arc<Notify>,
}

impl ProcessHandle {
    /// Creates a handle for a freshly spawned child.
    pub(crate) fn new(pid: Option<u32>) -> Self {
        Self {
            pid,
            terminating: Arc::new(AtomicBool::new(false)),
            terminated: Arc::new(AtomicBool::new(false)),
            destroy: Arc::new(Notify::new()),
        }
    }

    /// Creates a handle with no backing child, for tests.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::new(None)
    }

    /// OS process id, when the child was spawned successfully.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// True while destruction has been requested but the child has not
    /// been reaped yet.
    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst) && !self.is_terminated()
    }

    /// True once the child has exited and been reaped.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Request destruction of the process. Idempotent.
    pub fn destroy(&self) {
        self.terminating.store(true, Ordering::SeqCst);
        self.destroy.notify_one();
    }

    /// Flip the terminated flag directly, for tests.
    #[cfg(test)]
    pub(crate) fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

/// Spawns the monitor task for a launched child.
///
/// The task resolves when the child exits, either naturally or through a
/// destruction request, and then sends `Exited { name, launch_id }`.
pub(crate) fn spawn_monitor(
    name: String,
    launch_id: u64,
    mut child: Child,
    handle: ProcessHandle,
    events: UnboundedSender<LifecycleEvent>,
) {
    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            () = handle.destroy.notified() => terminate(&mut child).await,
        };

        handle.terminated.store(true, Ordering::SeqCst);

        match status {
            Ok(status) => {
                tracing::info!(
                    config = %name,
                    pid = handle.pid(),
                    exit_code = status.code(),
                    "Process exited"
                );
            },
            Err(e) => {
                tracing::warn!(config = %name, error = %e, "Failed to reap process");
            },
        }

        let _ = events.send(LifecycleEvent::Exited { name, launch_id });
    });
}

/// Graceful termination: SIGTERM, bounded wait, then SIGKILL.
async fn terminate(child: &mut Child) -> std::io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Ok(raw) = i32::try_from(pid) {
                let _ = kill(Pid::from_raw(raw), Signal::SIGTERM);
            }

            match tokio::time::timeout(TERM_TIMEOUT, child.wait()).await {
                Ok(status) => return status,
                Err(_) => {
                    tracing::warn!(pid = pid, "Process ignored SIGTERM, killing");
                },
            }
        }
    }

    child.kill().await?;
    child.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn detached_handle_flags() {
        let handle = ProcessHandle::detached();
        assert!(!handle.is_terminating());
        assert!(!handle.is_terminated());

        handle.destroy();
        assert!(handle.is_terminating());

        handle.mark_terminated();
        // Once reaped, the handle is terminated rather than terminating.
        assert!(!handle.is_terminating());
        assert!(handle.is_terminated());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn monitor_reports_natural_exit() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let child = tokio::process::Command::new("sh")
            .args(["-c", "exit 0"])
            .spawn()
            .unwrap();
        let handle = ProcessHandle::new(child.id());

        spawn_monitor("job".to_string(), 7, child, handle.clone(), tx);

        let event = rx.recv().await.unwrap();
        match event {
            LifecycleEvent::Exited { name, launch_id } => {
                assert_eq!(name, "job");
                assert_eq!(launch_id, 7);
            },
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(handle.is_terminated());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn destroy_kills_long_running_child() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let child = tokio::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let handle = ProcessHandle::new(child.id());

        spawn_monitor("job".to_string(), 1, child, handle.clone(), tx);
        handle.destroy();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("monitor should reap the child promptly")
            .unwrap();
        assert!(matches!(event, LifecycleEvent::Exited { launch_id: 1, .. }));
        assert!(handle.is_terminated());
        assert!(!handle.is_terminating());
    }
}

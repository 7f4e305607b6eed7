#![cfg(unix)]

//! End-to-end lifecycle tests running real child processes.
//!
//! These tests spawn `/bin/sh` through the full launch path: manifest,
//! dispatcher, launcher, monitor task, and registry drain. They are
//! Unix-only and rely on nothing outside the crate and a tempdir.

use runbridge::config::{ActionSettings, GlobalConfig};
use runbridge::dispatch::Action;
use runbridge::manifest::MANIFEST_FILE;
use runbridge::registry::RunStatus;
use runbridge::scope::Scope;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Helpers
// =============================================================================

const MANIFEST: &str = r#"
[project]
name = "lifecycle"

[[config]]
name = "sleeper"
command = "/bin/sh"
args = ["-c", "sleep 30"]

[[config]]
name = "chatty"
command = "/bin/sh"
args = ["-c", "echo ready; echo more output; sleep 30"]

[[config]]
name = "oneshot"
command = "/bin/sh"
args = ["-c", "true"]

[[config]]
name = "flagged"
command = "/bin/sh"
args = ["-c", "echo flag=${DEBUG_FLAG:-unset}; sleep 30"]

[config.debug]
env = { DEBUG_FLAG = "1" }
"#;

fn open_scope(root: &Path) -> Arc<Scope> {
    std::fs::write(root.join(MANIFEST_FILE), MANIFEST).unwrap();
    // Short restart grace keeps the restart test fast
    let config = GlobalConfig {
        actions: ActionSettings {
            restart_grace_ms: 100,
        },
        ..GlobalConfig::default()
    };
    Scope::open(root, &config).unwrap()
}

async fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {what}");
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_run_tracks_process_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open_scope(dir.path());
    let config = scope.manifest().get("sleeper").unwrap().clone();

    let result = scope.dispatcher().dispatch(&config, Action::Run).await;
    assert!(result.is_ok(), "launch failed: {}", result.message);
    assert_eq!(result.state, "running");

    wait_for("process to be tracked", || {
        scope.registry().status("sleeper") == RunStatus::Running
    })
    .await;

    let tracked = scope.registry().lookup("sleeper").unwrap();
    assert!(tracked.handle.pid().is_some());
    assert!(!tracked.debug);

    let result = scope.dispatcher().dispatch(&config, Action::Stop).await;
    assert!(result.is_ok());
    assert_eq!(result.state, "stopping");

    wait_for("process to be reaped", || {
        scope.registry().status("sleeper") == RunStatus::Idle
    })
    .await;
}

#[tokio::test]
async fn test_console_captures_process_output() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open_scope(dir.path());
    let config = scope.manifest().get("chatty").unwrap().clone();

    let result = scope.dispatcher().dispatch(&config, Action::Run).await;
    assert!(result.is_ok(), "launch failed: {}", result.message);

    wait_for("console output", || {
        scope
            .registry()
            .lookup("chatty")
            .is_some_and(|t| t.console.line_count() >= 2)
    })
    .await;

    let tracked = scope.registry().lookup("chatty").unwrap();
    let text = tracked.console.current_text();
    assert!(text.contains("ready"), "console was: {text:?}");
    assert!(text.contains("more output"), "console was: {text:?}");

    scope.shutdown().await;
}

#[tokio::test]
async fn test_natural_exit_returns_to_idle() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open_scope(dir.path());
    let config = scope.manifest().get("oneshot").unwrap().clone();

    let result = scope.dispatcher().dispatch(&config, Action::Run).await;
    assert!(result.is_ok(), "launch failed: {}", result.message);
    assert_eq!(result.state, "running");

    // The process exits by itself; the monitor reaps it and the drain task
    // removes the registry entry without any stop request.
    wait_for("exit to be reaped", || {
        scope.registry().lookup("oneshot").is_none()
    })
    .await;
    assert_eq!(scope.registry().status("oneshot"), RunStatus::Idle);
}

#[tokio::test]
async fn test_restart_replaces_process() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open_scope(dir.path());
    let config = scope.manifest().get("sleeper").unwrap().clone();

    scope.dispatcher().dispatch(&config, Action::Run).await;
    wait_for("first launch to be tracked", || {
        scope.registry().lookup("sleeper").is_some()
    })
    .await;
    let first = scope.registry().lookup("sleeper").unwrap();

    let result = scope.dispatcher().dispatch(&config, Action::Restart).await;
    assert!(result.is_ok(), "restart failed: {}", result.message);
    assert_eq!(result.state, "running");

    wait_for("replacement launch to be tracked", || {
        scope
            .registry()
            .lookup("sleeper")
            .is_some_and(|t| t.launch_id != first.launch_id)
    })
    .await;
    wait_for("old process to terminate", || first.handle.is_terminated()).await;
    assert_eq!(scope.registry().status("sleeper"), RunStatus::Running);

    scope.shutdown().await;
}

#[tokio::test]
async fn test_run_while_running_tracks_newest_launch() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open_scope(dir.path());
    let config = scope.manifest().get("sleeper").unwrap().clone();

    scope.dispatcher().dispatch(&config, Action::Run).await;
    wait_for("first launch to be tracked", || {
        scope.registry().lookup("sleeper").is_some()
    })
    .await;
    let first = scope.registry().lookup("sleeper").unwrap();

    let result = scope.dispatcher().dispatch(&config, Action::Run).await;
    assert!(result.is_ok(), "second launch failed: {}", result.message);

    wait_for("newest launch to be tracked", || {
        scope
            .registry()
            .lookup("sleeper")
            .is_some_and(|t| t.launch_id != first.launch_id)
    })
    .await;

    // The first process is no longer tracked; clean it up directly.
    first.handle.destroy();
    scope.shutdown().await;
}

#[tokio::test]
async fn test_debug_overrides_apply() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open_scope(dir.path());
    let config = scope.manifest().get("flagged").unwrap().clone();

    let result = scope.dispatcher().dispatch(&config, Action::Debug).await;
    assert!(result.is_ok(), "debug launch failed: {}", result.message);
    assert_eq!(result.state, "debugging");

    wait_for("debug console output", || {
        scope
            .registry()
            .lookup("flagged")
            .is_some_and(|t| t.console.line_count() >= 1)
    })
    .await;

    let tracked = scope.registry().lookup("flagged").unwrap();
    assert!(tracked.debug);
    assert_eq!(scope.registry().status("flagged"), RunStatus::Debugging);
    assert!(
        tracked.console.current_text().contains("flag=1"),
        "console was: {:?}",
        tracked.console.current_text()
    );

    scope.shutdown().await;
}

#[tokio::test]
async fn test_scope_shutdown_destroys_all_tracked() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open_scope(dir.path());

    for name in ["sleeper", "chatty"] {
        let config = scope.manifest().get(name).unwrap().clone();
        let result = scope.dispatcher().dispatch(&config, Action::Run).await;
        assert!(result.is_ok(), "launch of {name} failed: {}", result.message);
    }
    wait_for("both processes to be tracked", || {
        scope.registry().tracked_count() == 2
    })
    .await;

    scope.shutdown().await;
    assert_eq!(scope.registry().tracked_count(), 0);
}

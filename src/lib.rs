// =============================================================================
// Lint Configuration
// =============================================================================

// Safety: no unsafe code anywhere in this crate
#![deny(unsafe_code)]
// Correctness: Must handle all fallible operations
#![deny(unused_must_use)]
// Quality: Pedantic but pragmatic
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![allow(missing_debug_implementations)] // ActionDispatcher holds Arc<dyn Launcher> which lacks Debug

// Allowed with documented reasons
#![allow(clippy::missing_errors_doc)] // Error returns self-documenting via type
#![allow(clippy::missing_panics_doc)] // Panics documented in main entry points
#![allow(clippy::module_name_repetitions)] // e.g., registry::ProcessRegistry is clearer
#![allow(clippy::doc_markdown)] // Too many false positives in code docs
#![allow(clippy::must_use_candidate)] // Not all returned values need annotation
#![allow(clippy::unused_async)] // axum handlers are uniformly async

//! Library crate for runbridge - a loopback HTTP bridge for project run
//! configurations.
//!
//! The daemon serves one or more project roots. Each root carries a
//! `runbridge.toml` manifest declaring named run configurations; the HTTP
//! API starts, stops, and restarts those configurations and exposes their
//! captured console output and conventional log files.
//!
//! The crate is organized in three layers:
//!
//! - Project state: [`manifest`], [`config`], [`token`]
//! - Process supervision: [`launcher`], [`process`], [`console`],
//!   [`registry`], [`dispatch`], [`scope`]
//! - Surface: [`http`], [`logs`], plus [`error`], [`logging`], and
//!   [`metrics`]

/// Per-project `runbridge.toml` manifest.
///
/// # Example
///
/// ```
/// use runbridge::manifest::Manifest;
///
/// let manifest: Manifest = toml::from_str(r#"
/// [project]
/// name = "demo"
///
/// [[config]]
/// name = "app"
/// type = "cargo"
/// command = "cargo"
/// args = ["run"]
/// "#).unwrap();
///
/// assert_eq!(manifest.configs.len(), 1);
/// assert!(manifest.get("app").is_some());
/// ```
pub mod manifest;

/// Daemon-wide settings from `~/.runbridge/config.toml`.
pub mod config;

/// Per-installation bearer token management.
pub mod token;

/// Spawning run configurations as child processes.
pub mod launcher;

/// Child process handles and exit monitoring.
pub mod process;

/// Bounded in-memory capture of process output.
pub mod console;

/// Tracked processes and status resolution.
///
/// The registry maps configuration names to their most recent launch and
/// derives the externally visible status (idle, running, debugging,
/// stopping, finished) from the tracked process state.
pub mod registry;

/// Run, debug, stop, and restart dispatch.
pub mod dispatch;

/// Project scopes: one manifest, registry, and dispatcher per served root.
pub mod scope;

/// Log source enumeration, reading, and search.
pub mod logs;

/// The loopback HTTP API.
pub mod http;

/// API error types and their HTTP mapping.
pub mod error;

/// Structured logging setup.
pub mod logging;

/// Prometheus metrics.
pub mod metrics;

//! Log source discovery and access.
//!
//! A run configuration's log sources are the live console of its tracked
//! process (when one exists) plus any `.log`/`.txt` files found directly in
//! the conventional log directories under the project root. Enumeration is
//! performed fresh on every call; nothing is cached or watched.
//!
//! Every source exposes exactly one capability, [`SourceText::current_text`],
//! and the read/tail/search operations in [`reader`] work on one such
//! materialization per request.

pub mod reader;


pub use reader::{LogContent, SearchResponse, SearchResult};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::console::ConsoleBuffer;
use crate::registry::ProcessRegistry;

/// Name of the live console source.
pub const CONSOLE_SOURCE: &str = "console";

/// Directories probed for log files, relative to the project root.
/// Probed in order, without recursion.
pub const LOG_DIRS: [&str; 4] = ["logs", "log", "build/logs", "target/logs"];

/// File extensions treated as textual log files.
const LOG_EXTENSIONS: [&str; 2] = ["log", "txt"];

/// Kind tag of a log source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Console,
    File,
}

/// Wire-facing description of a log source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSource {
    /// Unique name within the enumeration, used in log URLs.
    pub name: String,
    /// Console or file.
    pub kind: SourceKind,
    /// Backing file path, for file sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Size in bytes, when cheap to compute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Line count, when cheap to compute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
}

/// Text-bearing backing of a log source.
#[derive(Debug, Clone)]
pub enum SourceText {
    Console(Arc<ConsoleBuffer>),
    File(PathBuf),
}

impl SourceText {
    /// Returns the full current text of the source.
    ///
    /// Files are read lossily; a missing or unreadable file yields empty
    /// text rather than an error, so a source deleted between enumeration
    /// and read degrades to a zero-content result.
    pub fn current_text(&self) -> String {
        match self {
            Self::Console(buffer) => buffer.current_text(),
            Self::File(path) => match std::fs::read(path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => String::new(),
            },
        }
    }
}

/// A log source paired with its text capability.
#[derive(Debug, Clone)]
pub struct EnumeratedSource {
    pub info: LogSource,
    pub text: SourceText,
}

/// Enumerates the log sources of a run configuration, console first.
///
/// The console source is present exactly when the registry has a tracked
/// process for `name`. File sources follow in [`LOG_DIRS`] order, each
/// directory's entries in `read_dir` order; missing directories are
/// silently skipped. When a later directory yields a file name that is
/// already taken, the source name is qualified with the directory label
/// (`build-logs-app.log`).
pub fn enumerate(root: &Path, registry: &ProcessRegistry, name: &str) -> Vec<EnumeratedSource> {
    let mut sources = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    if let Some(tracked) = registry.lookup(name) {
        let buffer = tracked.console;
        seen.insert(CONSOLE_SOURCE.to_string());
        sources.push(EnumeratedSource {
            info: LogSource {
                name: CONSOLE_SOURCE.to_string(),
                kind: SourceKind::Console,
                path: None,
                size_bytes: Some(buffer.byte_len() as u64),
                line_count: Some(buffer.line_count()),
            },
            text: SourceText::Console(buffer),
        });
    }

    for dir in LOG_DIRS {
        let dir_path = root.join(dir);
        let Ok(entries) = std::fs::read_dir(&dir_path) else {
            continue;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !LOG_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let source_name = if seen.contains(file_name) {
                format!("{}-{}", dir.replace('/', "-"), file_name)
            } else {
                file_name.to_string()
            };
            if !seen.insert(source_name.clone()) {
                continue;
            }

            let size_bytes = entry.metadata().ok().map(|m| m.len());
            sources.push(EnumeratedSource {
                info: LogSource {
                    name: source_name,
                    kind: SourceKind::File,
                    path: Some(path.clone()),
                    size_bytes,
                    line_count: None,
                },
                text: SourceText::File(path),
            });
        }
    }

    sources
}

/// Resolves a single source by name against a fresh enumeration.
pub fn resolve(
    root: &Path,
    registry: &ProcessRegistry,
    name: &str,
    source_name: &str,
) -> Option<EnumeratedSource> {
    enumerate(root, registry, name)
        .into_iter()
        .find(|source| source.info.name == source_name)
}

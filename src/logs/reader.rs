//! Paginated, tailed, and searched views over a log source.
//!
//! Every operation materializes the source's full current text exactly once
//! and works on its newline-delimited lines. Offsets and limits are clamped
//! into the valid range, so out-of-range requests yield empty windows
//! rather than errors.

use serde::{Deserialize, Serialize};

use super::EnumeratedSource;

/// A paginated window of log lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContent {
    /// Source name the window was read from.
    pub source: String,
    /// Line count of the full text at read time.
    pub total_lines: usize,
    /// Requested start line (for `tail`, the computed start).
    pub offset: usize,
    /// Requested window size.
    pub limit: usize,
    /// The window's lines.
    pub lines: Vec<String>,
    /// True when lines exist past the end of this window.
    pub has_more: bool,
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Zero-based line number of the match.
    pub line_number: usize,
    /// The matching line.
    pub line: String,
    /// Context window around the match: two lines before through two
    /// lines after, clamped at the text boundaries, match included.
    pub context: Vec<String>,
}

/// Search hits for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub source: String,
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// Reads a window of lines starting at `offset`.
pub fn read(source: &EnumeratedSource, offset: usize, limit: usize) -> LogContent {
    let text = source.text.current_text();
    paginate(&source.info.name, &text, offset, limit)
}

/// Reads the last `lines` lines.
///
/// Equivalent to `read` at offset `total_lines - lines` (clamped at zero)
/// over the same materialization.
pub fn tail(source: &EnumeratedSource, lines: usize) -> LogContent {
    let text = source.text.current_text();
    let total = text.lines().count();
    let start = total.saturating_sub(lines);
    paginate(&source.info.name, &text, start, lines)
}

/// Substring search over the source's lines.
///
/// Case-insensitive search folds both sides to lowercase. Scanning stops as
/// soon as `max_results` hits have been collected; results are in ascending
/// line order.
pub fn search(
    source: &EnumeratedSource,
    query: &str,
    case_sensitive: bool,
    max_results: usize,
) -> SearchResponse {
    let text = source.text.current_text();
    let lines: Vec<&str> = text.lines().collect();
    let needle = if case_sensitive {
        query.to_string()
    } else {
        query.to_lowercase()
    };

    let mut results = Vec::new();
    if max_results > 0 {
        for (i, line) in lines.iter().enumerate() {
            let matched = if case_sensitive {
                line.contains(&needle)
            } else {
                line.to_lowercase().contains(&needle)
            };
            if !matched {
                continue;
            }

            let from = i.saturating_sub(2);
            let to = (i + 3).min(lines.len());
            results.push(SearchResult {
                line_number: i,
                line: (*line).to_string(),
                context: lines[from..to].iter().map(|l| (*l).to_string()).collect(),
            });

            if results.len() >= max_results {
                break;
            }
        }
    }

    SearchResponse {
        source: source.info.name.clone(),
        query: query.to_string(),
        results,
    }
}

/// Clamped window over `text`'s lines. `offset` and `limit` echo the
/// request; the window itself is `[min(offset, total), min(offset + limit,
/// total))`.
fn paginate(source: &str, text: &str, offset: usize, limit: usize) -> LogContent {
    let all: Vec<&str> = text.lines().collect();
    let total = all.len();
    let start = offset.min(total);
    let end = start.saturating_add(limit).min(total);

    LogContent {
        source: source.to_string(),
        total_lines: total,
        offset,
        limit,
        lines: all[start..end].iter().map(|l| (*l).to_string()).collect(),
        has_more: end < total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::{LogSource, SourceKind, SourceText};
    use crate::console::ConsoleBuffer;
    use std::sync::Arc;

    fn file_source(dir: &std::path::Path, name: &str, content: &str) -> EnumeratedSource {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        EnumeratedSource {
            info: LogSource {
                name: name.to_string(),
                kind: SourceKind::File,
                path: Some(path.clone()),
                size_bytes: Some(content.len() as u64),
                line_count: None,
            },
            text: SourceText::File(path),
        }
    }

    fn numbered_lines(n: usize) -> String {
        (0..n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn read_whole_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", &numbered_lines(10));

        let content = read(&source, 0, 100);
        assert_eq!(content.total_lines, 10);
        assert_eq!(content.lines.len(), 10);
        assert_eq!(content.lines[0], "line 0");
        assert_eq!(content.lines[9], "line 9");
        assert!(!content.has_more);
    }

    #[test]
    fn read_middle_window_has_more() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", &numbered_lines(10));

        let content = read(&source, 3, 4);
        assert_eq!(content.offset, 3);
        assert_eq!(content.limit, 4);
        assert_eq!(content.lines, vec!["line 3", "line 4", "line 5", "line 6"]);
        assert!(content.has_more);
    }

    #[test]
    fn read_past_end_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "a\nb\nc\n");

        let content = read(&source, 10, 5);
        assert_eq!(content.total_lines, 3);
        assert_eq!(content.offset, 10);
        assert!(content.lines.is_empty());
        assert!(!content.has_more);
    }

    #[test]
    fn read_zero_limit_reports_remaining() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "a\nb\nc\n");

        let content = read(&source, 1, 0);
        assert!(content.lines.is_empty());
        assert!(content.has_more);

        let content = read(&source, 3, 0);
        assert!(!content.has_more);
    }

    #[test]
    fn tail_returns_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", &numbered_lines(10));

        let content = tail(&source, 3);
        assert_eq!(content.offset, 7);
        assert_eq!(content.lines, vec!["line 7", "line 8", "line 9"]);
        assert!(!content.has_more);
    }

    #[test]
    fn tail_larger_than_file_returns_everything() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "a\nb\nc\n");

        let content = tail(&source, 100);
        assert_eq!(content.offset, 0);
        assert_eq!(content.lines, vec!["a", "b", "c"]);
        assert!(!content.has_more);
    }

    #[test]
    fn empty_source_reads_as_zero_lines() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "");

        let content = read(&source, 0, 100);
        assert_eq!(content.total_lines, 0);
        assert!(content.lines.is_empty());
        assert!(!content.has_more);

        let content = tail(&source, 10);
        assert_eq!(content.total_lines, 0);
        assert!(content.lines.is_empty());
    }

    #[test]
    fn missing_file_reads_as_zero_lines() {
        let source = EnumeratedSource {
            info: LogSource {
                name: "gone.log".to_string(),
                kind: SourceKind::File,
                path: None,
                size_bytes: None,
                line_count: None,
            },
            text: SourceText::File("/nonexistent/runbridge-gone.log".into()),
        };

        let content = read(&source, 0, 10);
        assert_eq!(content.total_lines, 0);
        assert!(content.lines.is_empty());
    }

    #[test]
    fn console_source_paginates_like_files() {
        let buffer = Arc::new(ConsoleBuffer::new(16));
        buffer.push_line("one".into());
        buffer.push_line("two".into());
        buffer.push_line("three".into());

        let source = EnumeratedSource {
            info: LogSource {
                name: "console".to_string(),
                kind: SourceKind::Console,
                path: None,
                size_bytes: None,
                line_count: None,
            },
            text: SourceText::Console(buffer),
        };

        let content = read(&source, 1, 1);
        assert_eq!(content.lines, vec!["two"]);
        assert!(content.has_more);
    }

    #[test]
    fn search_is_case_insensitive_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "ok\nERROR: boom\nok\nerror again\n");

        let response = search(&source, "error", false, 100);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].line_number, 1);
        assert_eq!(response.results[1].line_number, 3);

        let sensitive = search(&source, "error", true, 100);
        assert_eq!(sensitive.results.len(), 1);
        assert_eq!(sensitive.results[0].line_number, 3);
    }

    #[test]
    fn search_context_clamps_at_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "hit\nb\nc\nd\nhit\n");

        let response = search(&source, "hit", true, 100);
        assert_eq!(response.results.len(), 2);

        // Match on the first line: window reaches two lines forward only.
        assert_eq!(response.results[0].context, vec!["hit", "b", "c"]);
        // Match on the last line: window reaches two lines back only.
        assert_eq!(response.results[1].context, vec!["c", "d", "hit"]);
    }

    #[test]
    fn search_full_context_window_includes_match() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "a\nb\nhit\nd\ne\nf\n");

        let response = search(&source, "hit", true, 100);
        assert_eq!(response.results[0].context, vec!["a", "b", "hit", "d", "e"]);
    }

    #[test]
    fn search_stops_at_max_results() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", &"match\n".repeat(10));

        let response = search(&source, "match", true, 3);
        assert_eq!(response.results.len(), 3);
        let numbers: Vec<usize> = response.results.iter().map(|r| r.line_number).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
    }

    #[test]
    fn search_zero_max_results_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "match\n");

        let response = search(&source, "match", true, 0);
        assert!(response.results.is_empty());
    }

    #[test]
    fn search_no_hits() {
        let dir = tempfile::tempdir().unwrap();
        let source = file_source(dir.path(), "app.log", "a\nb\n");

        let response = search(&source, "zzz", false, 100);
        assert!(response.results.is_empty());
        assert_eq!(response.query, "zzz");
    }
}

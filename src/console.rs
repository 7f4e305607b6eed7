//! In-memory console buffers for launched processes.
//!
//! Each launch gets a fixed-capacity ring of output lines fed by the
//! stdout/stderr reader tasks. Handlers read the full current text through
//! [`ConsoleBuffer::current_text`]; extraction always succeeds, and overflow
//! is visible through the dropped-line counter.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// A thread-safe, fixed-capacity ring buffer of console output lines.
#[derive(Debug)]
pub struct ConsoleBuffer {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    max_lines: usize,
    lines: VecDeque<String>,
    bytes: usize,
    dropped: u64,
}

impl ConsoleBuffer {
    /// Creates a new buffer with the specified maximum line capacity.
    pub fn new(max_lines: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                max_lines: max_lines.max(1),
                lines: VecDeque::with_capacity(max_lines.min(1024)),
                bytes: 0,
                dropped: 0,
            }),
        }
    }

    /// Adds a line to the buffer.
    ///
    /// Returns `true` if an old line was dropped to make room.
    pub fn push_line(&self, line: String) -> bool {
        let mut inner = self.inner.lock();
        inner.bytes += line.len();
        inner.lines.push_back(line);

        let mut dropped = false;
        while inner.lines.len() > inner.max_lines {
            if let Some(old) = inner.lines.pop_front() {
                inner.bytes -= old.len();
                inner.dropped += 1;
                dropped = true;
            }
        }
        dropped
    }

    /// Returns the full buffered text, lines joined by `\n`.
    pub fn current_text(&self) -> String {
        let inner = self.inner.lock();
        let mut text = String::with_capacity(inner.bytes + inner.lines.len());
        for (i, line) in inner.lines.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(line);
        }
        text
    }

    /// Returns the number of lines currently buffered.
    pub fn line_count(&self) -> usize {
        self.inner.lock().lines.len()
    }

    /// Returns the byte length of the buffered text (excluding separators).
    pub fn byte_len(&self) -> usize {
        self.inner.lock().bytes
    }

    /// Returns how many lines have been dropped to the ring limit so far.
    pub fn dropped_lines(&self) -> u64 {
        self.inner.lock().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_drops_oldest() {
        let buffer = ConsoleBuffer::new(2);
        assert!(!buffer.push_line("a".into()));
        assert!(!buffer.push_line("b".into()));
        assert!(buffer.push_line("c".into()));
        assert_eq!(buffer.current_text(), "b\nc");
        assert_eq!(buffer.dropped_lines(), 1);
    }

    #[test]
    fn empty_buffer_has_empty_text() {
        let buffer = ConsoleBuffer::new(8);
        assert_eq!(buffer.current_text(), "");
        assert_eq!(buffer.line_count(), 0);
        assert_eq!(buffer.byte_len(), 0);
    }

    #[test]
    fn byte_len_tracks_drops() {
        let buffer = ConsoleBuffer::new(1);
        buffer.push_line("hello".into());
        assert_eq!(buffer.byte_len(), 5);
        buffer.push_line("hi".into());
        assert_eq!(buffer.byte_len(), 2);
        assert_eq!(buffer.line_count(), 1);
    }

    #[test]
    fn zero_capacity_keeps_one_line() {
        let buffer = ConsoleBuffer::new(0);
        buffer.push_line("only".into());
        assert_eq!(buffer.current_text(), "only");
    }
}

//! Where console output goes.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Line-oriented output sink.
pub trait Output: Send {
    fn line(&mut self, text: &str);
}

/// Writes to stdout. Errors (closed pipe) are ignored: there is nobody left
/// to report them to.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn line(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

/// Collects lines in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferOutput {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

impl Output for BufferOutput {
    fn line(&mut self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(text.lines().map(str::to_string));
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_splits_multiline_text() {
        let buffer = BufferOutput::new();
        let mut sink = buffer.clone();
        sink.line("one\ntwo");
        sink.line("three");
        assert_eq!(buffer.lines(), vec!["one", "two", "three"]);
    }
}

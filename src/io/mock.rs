//! # Mock I/O Implementations for Testing
//!
//! Scripted input and captured output for driving sessions without a
//! terminal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{Console, LineSource};

/// Line source replaying a fixed script
#[derive(Debug, Clone, Default)]
pub struct ScriptedLineSource {
    lines: VecDeque<String>,
}

impl ScriptedLineSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a line to the script
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
    }
}

impl LineSource for ScriptedLineSource {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}

/// Console recording every printed line
///
/// Clones share the same record, so a test can keep one handle while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct CapturedConsole {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything printed so far, one entry per `print` call
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Everything printed so far as one string
    pub fn contents(&self) -> String {
        self.lines().join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Console for CapturedConsole {
    fn print(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_source_should_replay_lines_in_order() {
        let mut source = ScriptedLineSource::new(["sub grp1", "pub grp1 hi"]);
        source.push_line("exit");
        assert_eq!(source.next_line().await.as_deref(), Some("sub grp1"));
        assert_eq!(source.next_line().await.as_deref(), Some("pub grp1 hi"));
        assert_eq!(source.next_line().await.as_deref(), Some("exit"));
        assert_eq!(source.next_line().await, None);
    }

    #[test]
    fn captured_console_should_share_record_between_clones() {
        let console = CapturedConsole::new();
        let handle = console.clone();
        console.print("200 ok");
        handle.print("404 not found");
        assert_eq!(console.lines(), vec!["200 ok", "404 not found"]);
        assert!(handle.contains("not found"));
        assert_eq!(handle.contents(), "200 ok\n404 not found");
    }
}

//! # I/O Abstraction Layer
//!
//! Trait seams between the session logic and the terminal, so the
//! interactive flow can be driven from scripts in tests.
//!
//! ```text
//! Production:  producer ──▶ TerminalLineSource ──▶ stdin reader thread
//!              handler  ──▶ TerminalConsole    ──▶ stdout
//!
//! Testing:     producer ──▶ ScriptedLineSource ──▶ VecDeque<String>
//!              handler  ──▶ CapturedConsole    ──▶ Arc<Mutex<Vec<String>>>
//! ```

pub mod mock;
pub mod terminal;

pub use mock::{CapturedConsole, ScriptedLineSource};
pub use terminal::{TerminalConsole, TerminalLineSource};

/// Source of interactive input lines
///
/// Yields one line at a time without the trailing newline; `None` marks the
/// end of input.
#[allow(async_fn_in_trait)]
pub trait LineSource: Send {
    async fn next_line(&mut self) -> Option<String>;
}

/// Sink for user-facing output
///
/// Shared between the input flow (parse errors) and the session loop
/// (status lines, incoming messages), hence `&self`.
pub trait Console: Send + Sync {
    /// Print `text` followed by a newline
    fn print(&self, text: &str);
}

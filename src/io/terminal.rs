//! # Terminal I/O Implementations
//!
//! Production implementations reading stdin and writing stdout.

use std::io::{self, BufRead, Write};
use std::thread;

use tokio::sync::mpsc;

use super::{Console, LineSource};
use crate::config;

/// Reads stdin on a dedicated thread and hands lines to the async side.
///
/// The prompt is only shown when stdin is a terminal, so piped scripts
/// produce clean output.
pub struct TerminalLineSource {
    lines: mpsc::UnboundedReceiver<String>,
}

impl TerminalLineSource {
    /// Start the reader thread
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let show_prompt = atty::is(atty::Stream::Stdin);
        thread::spawn(move || read_stdin(tx, show_prompt));
        Self { lines: rx }
    }
}

fn read_stdin(tx: mpsc::UnboundedSender<String>, show_prompt: bool) {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        if show_prompt {
            print!("{}", config::PROMPT);
            let _ = io::stdout().flush();
        }
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!("Failed to read input: {e}");
                break;
            }
        }
    }
    tracing::debug!("Input reader finished");
}

impl LineSource for TerminalLineSource {
    async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

/// Console writing to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for TerminalConsole {
    fn print(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{text}");
        let _ = stdout.flush();
    }
}

//! Configuration constants and utilities for chatline
//!
//! Defaults for both binaries, with environment overrides checked before
//! falling back to the compiled-in values. Command-line flags win over both.

use std::path::PathBuf;
use std::time::Duration;

/// Name reported in the handshake user agent
pub const APP_NAME: &str = "chatline";

/// Crate version, reported in the handshake user agent
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version announced in the handshake
pub const PROTOCOL_VERSION: &str = "0.14";

/// Language announced in the handshake
pub const DEFAULT_LANGUAGE: &str = "EN";

/// Default address of the chat server
pub const DEFAULT_HOST: &str = "localhost:6061";

/// Default address the bot's account-event endpoint binds to
pub const DEFAULT_LISTEN: &str = "0.0.0.0:40051";

/// Upper bound on concurrently running account-event handlers
pub const PLUGIN_WORKERS: usize = 16;

/// Prompt shown by the interactive client
pub const PROMPT: &str = "tn> ";

/// Default cookie file path
pub const DEFAULT_COOKIE_PATH: &str = "~/.chatline-cookie";

/// Environment variable name for overriding the cookie path
pub const COOKIE_PATH_ENV_VAR: &str = "CHATLINE_COOKIE_PATH";

/// Environment variable name for the log filter
pub const LOG_LEVEL_ENV_VAR: &str = "CHATLINE_LOG_LEVEL";

/// Log filter used when the environment does not set one
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Prefix the bot puts in front of every echoed message
pub const DEFAULT_REPLY_PREFIX: &str = "I hear you: ";

/// User agent string sent in the handshake
pub fn user_agent() -> String {
    format!("{APP_NAME}/{APP_VERSION}")
}

/// Get the cookie file path, checking environment variable first, then falling back to default
pub fn get_cookie_path() -> PathBuf {
    let raw = std::env::var_os(COOKIE_PATH_ENV_VAR)
        .and_then(|val| val.into_string().ok())
        .unwrap_or_else(|| DEFAULT_COOKIE_PATH.to_string());
    expand_path(&raw)
}

/// Expand a leading `~` to the home directory
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// What the bot does when its session with the server ends with an error.
///
/// The default is to give up and let an external supervisor restart the
/// process; retries are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    #[default]
    Exit,
    Retry { attempts: u32, delay: Duration },
}

impl ReconnectPolicy {
    pub fn from_args(attempts: u32, delay_ms: u64) -> Self {
        if attempts == 0 {
            ReconnectPolicy::Exit
        } else {
            ReconnectPolicy::Retry {
                attempts,
                delay: Duration::from_millis(delay_ms),
            }
        }
    }

    /// Delay before reconnect attempt number `attempt` (1-based), or `None`
    /// once the policy is exhausted.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::Exit => None,
            ReconnectPolicy::Retry { attempts, delay } => (attempt <= attempts).then_some(delay),
        }
    }
}

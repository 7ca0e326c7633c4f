//! # Client Errors
//!
//! Error taxonomy shared by the interactive client and the bot.
//! Only transport-level failures end a session; everything else is
//! resolved at the scope of a single command or field.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed interactive input. Carries the text to show the user
    /// (a grammar's usage or the list of known verbs).
    #[error("{0}")]
    CommandSyntax(String),
    #[error("invalid {field} '{value}': expected an integer")]
    ValueConversion { field: &'static str, value: String },
    #[error("cannot access '{}': {source}", path.display())]
    FileAccess { path: PathBuf, source: io::Error },
    #[error("failed to connect to {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to listen on {addr}: {source}")]
    Listen { addr: String, source: io::Error },
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),
    #[error("failed to decode server message: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("server closed the stream")]
    StreamClosed,
}

impl ClientError {
    /// Errors that terminate the session rather than a single request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Connect { .. }
                | ClientError::Listen { .. }
                | ClientError::Transport(_)
                | ClientError::Codec(_)
                | ClientError::StreamClosed
        )
    }

    pub(crate) fn value_conversion(field: &'static str, value: impl Into<String>) -> Self {
        ClientError::ValueConversion {
            field,
            value: value.into(),
        }
    }
}

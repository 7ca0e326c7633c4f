//! # Cookie Store
//!
//! Persists the parameters of the last successful login so a later session
//! can authenticate with the server-issued token.

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::config;
use crate::error::ClientError;
use crate::protocol::Params;

/// Authentication scheme used with a cookie token
pub const TOKEN_SCHEME: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured location (`CHATLINE_COOKIE_PATH` or default)
    pub fn from_env() -> Self {
        Self::new(config::get_cookie_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved parameters.
    ///
    /// A missing, unreadable or malformed cookie is logged and treated as
    /// no cookie at all.
    pub fn load(&self) -> Option<Params> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(source) => {
                let e = ClientError::FileAccess {
                    path: self.path.clone(),
                    source,
                };
                tracing::warn!("No usable cookie: {e}");
                return None;
            }
        };
        match serde_json::from_str::<Params>(&text) {
            Ok(params) => Some(params),
            Err(e) => {
                tracing::warn!("Ignoring malformed cookie '{}': {e}", self.path.display());
                None
            }
        }
    }

    /// Write `params` as a JSON object, replacing any previous cookie
    pub fn save(&self, params: &Params) -> Result<(), ClientError> {
        let text = serde_json::to_string(params)?;
        fs::write(&self.path, text).map_err(|source| ClientError::FileAccess {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!("Saved cookie to '{}'", self.path.display());
        Ok(())
    }

    /// Token-scheme secret from the saved cookie, if there is a usable one
    pub fn load_token_secret(&self) -> Option<Vec<u8>> {
        self.load().as_ref().and_then(token_secret)
    }
}

/// Decode the base64 `token` parameter into a login secret
pub fn token_secret(params: &Params) -> Option<Vec<u8>> {
    let Some(Value::String(token)) = params.get("token") else {
        tracing::warn!("Cookie has no token");
        return None;
    };
    match STANDARD.decode(token) {
        Ok(secret) => Some(secret),
        Err(e) => {
            tracing::warn!("Cookie token is not valid base64: {e}");
            None
        }
    }
}

/// User id announced in login parameters
pub fn authenticated_user(params: &Params) -> String {
    params
        .get("user")
        .map(super::pending::param_text)
        .unwrap_or_else(|| "<unknown>".to_string())
}

//! # Pending-Callback Table
//!
//! One-shot actions waiting for the control response to a specific request.

use std::collections::HashMap;

use serde_json::Value;

use crate::protocol::Params;

/// Post-response action attached to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Show the parameters the server announced in its handshake reply
    PrintServerParams,
    /// Persist the login parameters to the cookie file
    SaveCookie,
}

/// Status codes that let a pending action fire
pub fn is_success(code: i32) -> bool {
    (200..400).contains(&code)
}

/// Actions keyed by the id of the request they wait on.
///
/// Owned by the session loop; nothing else touches it.
#[derive(Debug, Default)]
pub struct PendingCallbackTable {
    entries: HashMap<String, PendingAction>,
}

impl PendingCallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an action, replacing any earlier one for the same id
    pub fn register(&mut self, id: impl Into<String>, action: PendingAction) {
        let id = id.into();
        if let Some(previous) = self.entries.insert(id.clone(), action) {
            tracing::warn!("Replaced pending {previous:?} for request {id}");
        }
    }

    /// Remove the entry for `id` and hand it back if `code` is a success.
    ///
    /// Failed requests drop their action silently; unknown ids are normal
    /// since most requests never register anything.
    pub fn resolve(&mut self, id: &str, code: i32) -> Option<PendingAction> {
        let action = self.entries.remove(id)?;
        if is_success(code) {
            Some(action)
        } else {
            tracing::debug!("Dropping {action:?} for request {id}: status {code}");
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lines printed for a successful handshake
pub fn server_params_lines(params: &Params) -> Vec<String> {
    std::iter::once("Connected to server:".to_string())
        .chain(
            params
                .iter()
                .map(|(key, value)| format!("\t{key}: {}", param_text(value))),
        )
        .collect()
}

/// Parameter value as shown to the user; strings without quotes
pub fn param_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

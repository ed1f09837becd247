//! Menu commands registered by scripts.

use crate::capabilities::ScriptCallback;
use crate::lock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use userjs_types::ScriptId;

/// Registry key of a menu command: `"<scriptId>:<caption>"`.
pub fn command_key(script_id: ScriptId, caption: &str) -> String {
    format!("{script_id}:{caption}")
}

#[derive(Default)]
pub struct CommandRegistry {
    handlers: Mutex<HashMap<String, ScriptCallback>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a handler and returns its key.
    pub fn register(&self, script_id: ScriptId, caption: &str, handler: ScriptCallback) -> String {
        let key = command_key(script_id, caption);
        lock(&self.handlers).insert(key.clone(), handler);
        key
    }

    /// Removes a handler, returning its key if it existed.
    pub fn unregister(&self, script_id: ScriptId, caption: &str) -> Option<String> {
        let key = command_key(script_id, caption);
        lock(&self.handlers).remove(&key).map(|_| key)
    }

    /// Runs the handler registered under `key`.
    pub fn trigger(&self, key: &str) -> bool {
        let handler = lock(&self.handlers).get(key).cloned();
        match handler {
            Some(handler) => {
                handler(Value::Null);
                true
            }
            None => {
                debug!(key, "No menu command registered");
                false
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.handlers).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.handlers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = lock(&self.handlers).keys().cloned().collect();
        keys.sort();
        f.debug_struct("CommandRegistry").field("keys", &keys).finish()
    }
}

//! Per-script value cache.
//!
//! Values arrive encoded from the host and are kept encoded. Each entry is a
//! one-character type tag followed by the payload:
//!
//! | Tag | Payload |
//! |-----|---------|
//! | `o` | JSON text |
//! | `n` | decimal number (legacy) |
//! | `b` | `true` or anything else (legacy) |
//!
//! Only `o` is ever written. Reads and writes are synchronous against the
//! local cache; writes are forwarded to the host one key at a time.

use crate::lock;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};
use userjs_bridge::{CoreMessage, HostPort, UpdateValueMessage, ValueMap};
use userjs_types::ScriptId;

#[derive(Debug, Error)]
pub enum ValueDecodeError {
    #[error("empty value")]
    Empty,

    #[error("unknown type tag '{0}'")]
    UnknownTag(char),

    #[error("bad JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad number payload: {0:?}")]
    Number(String),
}

/// Encodes a value the way the host stores it.
pub fn encode_value(value: &Value) -> String {
    format!("o{value}")
}

/// Decodes a tagged value.
pub fn decode_value(raw: &str) -> Result<Value, ValueDecodeError> {
    let mut chars = raw.chars();
    let tag = chars.next().ok_or(ValueDecodeError::Empty)?;
    let payload = chars.as_str();
    match tag {
        'o' => Ok(serde_json::from_str(payload)?),
        'n' => decode_number(payload),
        'b' => Ok(Value::Bool(payload == "true")),
        other => Err(ValueDecodeError::UnknownTag(other)),
    }
}

fn decode_number(payload: &str) -> Result<Value, ValueDecodeError> {
    let trimmed = payload.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(Value::from(int));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| ValueDecodeError::Number(payload.to_string()))
}

/// Strips the tag for the raw-payload fallback.
fn payload_of(raw: &str) -> &str {
    let mut chars = raw.chars();
    chars.next();
    chars.as_str()
}

pub struct ValueStore {
    scripts: Mutex<HashMap<ScriptId, ValueMap>>,
    port: Arc<dyn HostPort>,
    debug: bool,
}

impl ValueStore {
    /// An empty cache forwarding writes to `port`.
    pub fn new(port: Arc<dyn HostPort>, debug: bool) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            port,
            debug,
        }
    }

    /// Installs the initial mapping of a script.
    pub fn insert_script(&self, id: ScriptId, values: ValueMap) {
        lock(&self.scripts).insert(id, values);
    }

    /// Adds an empty mapping for a script that has none yet.
    pub fn register_script(&self, id: ScriptId) {
        lock(&self.scripts).entry(id).or_default();
    }

    pub fn contains_script(&self, id: ScriptId) -> bool {
        lock(&self.scripts).contains_key(&id)
    }

    /// Current encoded mapping of a script, empty if unknown.
    pub fn load(&self, id: ScriptId) -> ValueMap {
        lock(&self.scripts).get(&id).cloned().unwrap_or_default()
    }

    /// Decoded value of `key`, if present.
    ///
    /// A value that fails to decode is returned as its raw payload string.
    pub fn get(&self, id: ScriptId, key: &str) -> Option<Value> {
        let raw = lock(&self.scripts).get(&id)?.get(key)?.clone();
        Some(match decode_value(&raw) {
            Ok(value) => value,
            Err(e) => {
                if self.debug {
                    debug!(script_id = %id, key, error = %e, "Undecodable value, returning raw payload");
                }
                Value::String(payload_of(&raw).to_string())
            }
        })
    }

    /// Decoded value of `key`, or `default` when absent.
    pub fn get_or(&self, id: ScriptId, key: &str, default: Value) -> Value {
        self.get(id, key).unwrap_or(default)
    }

    /// Stores a value locally and forwards it to the host.
    ///
    /// Returns `false` and sends nothing for a script not on this page.
    pub fn set(&self, id: ScriptId, key: &str, value: &Value) -> bool {
        let encoded = encode_value(value);
        {
            let mut scripts = lock(&self.scripts);
            let Some(values) = scripts.get_mut(&id) else {
                warn!(script_id = %id, key, "Dropping write for a script not on this page");
                return false;
            };
            values.insert(key.to_string(), encoded.clone());
        }
        self.port.send(CoreMessage::UpdateValue(UpdateValueMessage {
            script_id: id,
            key: key.to_string(),
            value: Some(encoded),
        }));
        true
    }

    /// Removes a value locally and asks the host to delete it.
    ///
    /// Returns `false` and sends nothing for a script not on this page.
    pub fn delete(&self, id: ScriptId, key: &str) -> bool {
        match lock(&self.scripts).get_mut(&id) {
            Some(values) => {
                values.remove(key);
            }
            None => {
                warn!(script_id = %id, key, "Dropping delete for a script not on this page");
                return false;
            }
        }
        self.port.send(CoreMessage::UpdateValue(UpdateValueMessage {
            script_id: id,
            key: key.to_string(),
            value: None,
        }));
        true
    }

    /// Sorted key list of a script.
    pub fn keys(&self, id: ScriptId) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.scripts)
            .get(&id)
            .map(|values| values.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Replaces the mapping of a script already known to this page.
    /// Returns `false` and changes nothing for an unknown script.
    pub fn apply_remote_update(&self, id: ScriptId, values: ValueMap) -> bool {
        match lock(&self.scripts).get_mut(&id) {
            Some(current) => {
                *current = values;
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("scripts", &lock(&self.scripts).len())
            .field("debug", &self.debug)
            .finish()
    }
}

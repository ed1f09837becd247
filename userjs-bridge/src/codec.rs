//! Envelope framing for bridge messages.
//!
//! Decoding is two-step: the text is read as a loose `{cmd, data}`
//! envelope first, so a command tag this version does not know is
//! reported as `Ok(None)` instead of an error. Hosts newer than the engine
//! may therefore add commands freely.

use crate::error::{BridgeError, BridgeResult};
use crate::protocol::{CoreMessage, HostMessage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Maximum encoded message size (64 MB; resource caches travel inline).
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

#[derive(Deserialize)]
struct Envelope {
    cmd: String,
    #[serde(default)]
    data: Value,
}

/// Encodes an outbound message.
pub fn encode_core(message: &CoreMessage) -> BridgeResult<String> {
    encode(message)
}

/// Encodes a host message (used by test hosts and the replay tool).
pub fn encode_host(message: &HostMessage) -> BridgeResult<String> {
    encode(message)
}

/// Decodes an inbound message. Unknown commands yield `Ok(None)`.
pub fn decode_host(text: &str) -> BridgeResult<Option<HostMessage>> {
    decode(text, HostMessage::COMMANDS)
}

/// Decodes an outbound message. Unknown commands yield `Ok(None)`.
pub fn decode_core(text: &str) -> BridgeResult<Option<CoreMessage>> {
    decode(text, CoreMessage::COMMANDS)
}

fn encode<T: Serialize>(message: &T) -> BridgeResult<String> {
    let text = serde_json::to_string(message)?;
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(BridgeError::TooLarge(text.len()));
    }
    Ok(text)
}

fn decode<T: DeserializeOwned>(text: &str, known: &[&str]) -> BridgeResult<Option<T>> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(BridgeError::TooLarge(text.len()));
    }

    let envelope: Envelope = serde_json::from_str(text)?;
    if !known.contains(&envelope.cmd.as_str()) {
        debug!(cmd = %envelope.cmd, "Ignoring unknown bridge command");
        return Ok(None);
    }

    let cmd = envelope.cmd;
    let tagged = serde_json::json!({ "cmd": cmd, "data": envelope.data });
    serde_json::from_value(tagged)
        .map(Some)
        .map_err(|e| BridgeError::Malformed {
            command: cmd,
            reason: e.to_string(),
        })
}

//! Message bridge between the in-page engine and the privileged host.
//!
//! The page side has no privileged access of its own. Everything it needs
//! from the host travels as a JSON envelope over an ordered,
//! fire-and-forget channel:
//!
//! ```text
//! engine                          host
//! ------                          ----
//! port.send(CoreMessage)   -->    { "cmd": "AddStyle", "data": {...} }
//!   registers continuation
//!                          <--    { "cmd": "Callback", "data": {...} }
//! callbacks.resolve(id)
//! ```
//!
//! - **Protocol**: the two message enums and their payloads
//! - **Codec**: envelope framing, tolerant of unknown commands
//! - **Port**: the outbound half (`HostPort`) with channel and recording ports
//! - **Callbacks**: correlation of outbound requests with their replies

pub mod callbacks;
pub mod codec;
mod error;
pub mod port;
pub mod protocol;

pub use callbacks::{CallbackRegistry, Continuation};
pub use codec::{decode_core, decode_host, encode_core, encode_host, MAX_MESSAGE_SIZE};
pub use error::{BridgeError, BridgeResult};
pub use port::{mock, ChannelPort, HostPort};
pub use protocol::{
    AddStyleMessage, CallbackMessage, ClipboardMessage, CommandMessage, CommandResponseMessage,
    CoreMessage, HostMessage, InjectMessage, InjectedMessage, LoadScriptsMessage, MenuMessage,
    NotificationEventMessage, PostCommandMessage, ScriptCheckedMessage, TabClosedMessage,
    UnregisterMenuMessage, UpdateValueMessage, ValueMap, WatchOnlineMessage,
};

//! Bridge protocol messages and payloads.
//!
//! Both directions use adjacently tagged envelopes: the variant name is the
//! `cmd` field and the payload sits under `data`. Payload fields are
//! camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use userjs_types::{RequestId, ScriptDescriptor, ScriptId};

/// Encoded values of one script, keyed by value name.
pub type ValueMap = HashMap<String, String>;

/// A message from the host to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data")]
pub enum HostMessage {
    /// Scripts matching this page, with everything needed to run them.
    LoadScripts(LoadScriptsMessage),

    /// The user picked a menu command.
    Command(CommandMessage),

    /// Reply to a request registered in the callback registry.
    Callback(CallbackMessage),

    /// Request-multiplexer bookkeeping (opaque to the engine).
    GotRequestId(Value),

    /// Request-multiplexer progress event (opaque to the engine).
    HttpRequested(Value),

    /// A tab opened through `GM_openInTab` was closed.
    TabClosed(TabClosedMessage),

    /// Full replacement of value maps changed elsewhere.
    UpdatedValues(HashMap<ScriptId, ValueMap>),

    NotificationClicked(NotificationEventMessage),

    NotificationClosed(NotificationEventMessage),

    /// Answer to an installed-script check from the page entry point.
    ScriptChecked(ScriptCheckedMessage),

    /// Answer to a `PostCommand`.
    CommandResponse(CommandResponseMessage),

    /// The "watch online" menu entry was clicked.
    WatchOnlineMenuClicked(WatchOnlineMessage),

    /// An `Inject` completed and the injected function is installed.
    Injected(InjectedMessage),
}

impl HostMessage {
    /// Every command tag this version understands.
    pub const COMMANDS: &'static [&'static str] = &[
        "LoadScripts",
        "Command",
        "Callback",
        "GotRequestId",
        "HttpRequested",
        "TabClosed",
        "UpdatedValues",
        "NotificationClicked",
        "NotificationClosed",
        "ScriptChecked",
        "CommandResponse",
        "WatchOnlineMenuClicked",
        "Injected",
    ];

    /// Returns the command tag of this message.
    pub fn command(&self) -> &'static str {
        match self {
            Self::LoadScripts(_) => "LoadScripts",
            Self::Command(_) => "Command",
            Self::Callback(_) => "Callback",
            Self::GotRequestId(_) => "GotRequestId",
            Self::HttpRequested(_) => "HttpRequested",
            Self::TabClosed(_) => "TabClosed",
            Self::UpdatedValues(_) => "UpdatedValues",
            Self::NotificationClicked(_) => "NotificationClicked",
            Self::NotificationClosed(_) => "NotificationClosed",
            Self::ScriptChecked(_) => "ScriptChecked",
            Self::CommandResponse(_) => "CommandResponse",
            Self::WatchOnlineMenuClicked(_) => "WatchOnlineMenuClicked",
            Self::Injected(_) => "Injected",
        }
    }
}

/// A message from the engine to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "data")]
pub enum CoreMessage {
    /// The engine is listening; the host may send `LoadScripts`.
    Ready,

    /// Inject one assembled script into the page.
    Inject(InjectMessage),

    /// Generic request on behalf of the hosting page.
    PostCommand(PostCommandMessage),

    AddStyle(AddStyleMessage),

    RegisterMenu(MenuMessage),

    UnregisterMenu(UnregisterMenuMessage),

    SetClipboard(ClipboardMessage),

    /// Persist (or delete, when `value` is null) one value.
    UpdateValue(UpdateValueMessage),

    /// Close the current tab.
    TabClose,
}

impl CoreMessage {
    pub const COMMANDS: &'static [&'static str] = &[
        "Ready",
        "Inject",
        "PostCommand",
        "AddStyle",
        "RegisterMenu",
        "UnregisterMenu",
        "SetClipboard",
        "UpdateValue",
        "TabClose",
    ];

    pub fn command(&self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Inject(_) => "Inject",
            Self::PostCommand(_) => "PostCommand",
            Self::AddStyle(_) => "AddStyle",
            Self::RegisterMenu(_) => "RegisterMenu",
            Self::UnregisterMenu(_) => "UnregisterMenu",
            Self::SetClipboard(_) => "SetClipboard",
            Self::UpdateValue(_) => "UpdateValue",
            Self::TabClose => "TabClose",
        }
    }
}

/// Everything the engine needs to run the scripts of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadScriptsMessage {
    /// Host (extension) version, reported through `GM_info`.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub scripts: Vec<ScriptDescriptor>,
    /// Encoded values per script.
    #[serde(default)]
    pub values: HashMap<ScriptId, ValueMap>,
    /// Source text per script.
    #[serde(default)]
    pub code: HashMap<ScriptId, String>,
    /// Dependency source keyed by resolved URL.
    #[serde(default)]
    pub require: HashMap<String, String>,
    /// Base64 resource bodies keyed by resolved URL.
    #[serde(default)]
    pub cache: HashMap<String, String>,
}

impl LoadScriptsMessage {
    /// Creates an empty load for the given host version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Adds a script with its source.
    pub fn with_script(mut self, script: ScriptDescriptor, code: impl Into<String>) -> Self {
        self.code.insert(script.id, code.into());
        self.scripts.push(script);
        self
    }

    /// Adds the initial value map of a script.
    pub fn with_values(mut self, id: ScriptId, values: ValueMap) -> Self {
        self.values.insert(id, values);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMessage {
    /// `"<scriptId>:<caption>"`.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackMessage {
    pub callback_id: RequestId,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabClosedMessage {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEventMessage {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCheckedMessage {
    pub callback_id: RequestId,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponseMessage {
    pub request_id: RequestId,
    #[serde(default)]
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOnlineMessage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedMessage {
    pub notify_id: String,
}

/// One assembled script ready for injection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectMessage {
    /// Id of the script element the host creates.
    pub element_id: String,
    /// Positional parameter names of the injected function.
    pub arg_names: Vec<String>,
    /// Function body.
    pub code: String,
    /// Global name the host installs the function under.
    pub notify_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommandMessage {
    pub cmd: String,
    pub request_id: RequestId,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStyleMessage {
    pub css: String,
    pub callback_id: RequestId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuMessage {
    pub key: String,
    pub caption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterMenuMessage {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardMessage {
    pub data: String,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValueMessage {
    pub script_id: ScriptId,
    pub key: String,
    /// Encoded value, or `None` for a deletion.
    pub value: Option<String>,
}

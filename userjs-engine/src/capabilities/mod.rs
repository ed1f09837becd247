//! GM API functions.
//!
//! Scripts reach these only through [`Sandbox::call`](crate::Sandbox::call),
//! which refuses anything outside the script's grant set. Arguments arrive
//! as [`Arg`]s: JSON values, script functions, or option objects carrying
//! their function-valued fields as named handlers.

mod delegated;
pub(crate) mod info;
mod menu;
mod resources;
mod style;
mod values;

pub use delegated::{RequestHandle, TabHandle};
pub use style::StylePromise;

use crate::collaborators::Handlers;
use crate::error::CapabilityError;
use crate::sandbox::{Capability, Sandbox};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A script function the engine may call back.
pub type ScriptCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// One argument of a GM call.
#[derive(Clone)]
pub enum Arg {
    Value(Value),
    Callback(ScriptCallback),
    /// An options object; function-valued fields are split out as handlers.
    Object { fields: Value, handlers: Handlers },
}

impl Arg {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn callback(f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self::Callback(Arc::new(f))
    }

    pub fn object(fields: Value, handlers: Handlers) -> Self {
        Self::Object { fields, handlers }
    }

    /// JSON view of the argument; options objects yield their plain fields.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) | Self::Object { fields: v, .. } => Some(v),
            Self::Callback(_) => None,
        }
    }

    /// The callable, or `None` if the argument is not a function.
    pub fn as_callback(&self) -> Option<&ScriptCallback> {
        match self {
            Self::Callback(f) => Some(f),
            _ => None,
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Callback(_) => f.write_str("Callback"),
            Self::Object { fields, handlers } => f
                .debug_struct("Object")
                .field("fields", fields)
                .field("handlers", handlers)
                .finish(),
        }
    }
}

/// What a GM call hands back to the script.
#[derive(Debug, Clone)]
pub enum GmReturn {
    Undefined,
    Value(Value),
    Style(StylePromise),
    Tab(TabHandle),
    Request(RequestHandle),
}

impl GmReturn {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

/// Positional arguments of one call.
pub(crate) struct Args {
    capability: &'static str,
    items: Vec<Arg>,
}

impl Args {
    pub(crate) fn new(capability: &'static str, items: Vec<Arg>) -> Self {
        Self { capability, items }
    }

    pub(crate) fn capability(&self) -> &'static str {
        self.capability
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Arg> {
        self.items.get(index)
    }

    pub(crate) fn value(&self, index: usize) -> Option<&Value> {
        self.get(index).and_then(Arg::as_value)
    }

    /// String form of a present, non-null argument.
    pub(crate) fn opt_string(&self, index: usize) -> Option<String> {
        match self.value(index)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub(crate) fn string(&self, index: usize, what: &str) -> Result<String, CapabilityError> {
        self.opt_string(index)
            .ok_or_else(|| CapabilityError::invalid(self.capability, format!("missing {what}")))
    }

    /// The callable at `index`; non-functions yield `None` and register nothing.
    pub(crate) fn callback(&self, index: usize) -> Option<ScriptCallback> {
        self.get(index).and_then(Arg::as_callback).cloned()
    }

    pub(crate) fn handlers(&self, index: usize) -> Handlers {
        match self.get(index) {
            Some(Arg::Object { handlers, .. }) => handlers.clone(),
            _ => Handlers::new(),
        }
    }

    /// Log-friendly rendering of every argument.
    pub(crate) fn render(&self) -> String {
        self.items
            .iter()
            .map(|arg| match arg {
                Arg::Value(Value::String(s)) => s.clone(),
                Arg::Value(v) | Arg::Object { fields: v, .. } => v.to_string(),
                Arg::Callback(_) => "[function]".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// String field of an options object.
pub(crate) fn field_str(fields: &Value, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub(crate) fn invoke(sandbox: &Sandbox, capability: Capability, items: Vec<Arg>) -> Result<GmReturn, CapabilityError> {
    let args = Args::new(capability.name(), items);
    match capability {
        Capability::GetValue => values::get_value(sandbox, &args),
        Capability::SetValue => values::set_value(sandbox, &args),
        Capability::DeleteValue => values::delete_value(sandbox, &args),
        Capability::ListValues => values::list_values(sandbox),
        Capability::GetResourceText => resources::get_resource_text(sandbox, &args),
        Capability::GetResourceUrl => resources::get_resource_url(sandbox, &args),
        Capability::AddStyle => style::add_style(sandbox, &args),
        Capability::Log => delegated::log(sandbox, &args),
        Capability::OpenInTab => delegated::open_in_tab(sandbox, &args),
        Capability::RegisterMenuCommand => menu::register(sandbox, &args),
        Capability::UnregisterMenuCommand => menu::unregister(sandbox, &args),
        Capability::XmlHttpRequest => delegated::xmlhttp_request(sandbox, &args),
        Capability::Download => delegated::download(sandbox, &args),
        Capability::Notification => delegated::notification(sandbox, &args),
        Capability::SetClipboard => delegated::set_clipboard(sandbox, &args),
        Capability::UnsafeWindow | Capability::Info | Capability::WindowClose => {
            Err(CapabilityError::NotCallable(capability.name().to_string()))
        }
    }
}

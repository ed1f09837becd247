//! Protected view of the page's global object.
//!
//! Each name known on the real global when the view is built gets one slot:
//!
//! - **Blocked**: reads as undefined, ignores writes, cannot be called.
//! - **Bound**: allow-listed function captured at build time and invoked
//!   with the real global as `this`.
//! - **Direct**: captured at build time and passed through unchanged (`eval`).
//! - **Live**: `on*` event handler properties, read and written through.
//! - **Snapshot**: copied from the real global on first read.
//!
//! Names unknown at build time behave as plain properties of the view.
//! Whatever the slot, a read that yields the real global yields the view.
//! Calls go to the function value the view hands out, never to whatever
//! the page has since stored under the same name.

use crate::error::HostError;
use crate::lock;
use crate::window::{HostValue, HostWindow};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use userjs_bridge::{CoreMessage, HostPort};

/// Globals never reachable from a wrapped script.
pub const BLOCKED_GLOBALS: &[&str] = &["browser", "chrome"];

/// Global functions re-exposed as wrappers bound to the real global.
pub const BOUND_FUNCTIONS: &[&str] = &[
    "isFinite",
    "isNaN",
    "parseFloat",
    "parseInt",
    "decodeURI",
    "decodeURIComponent",
    "encodeURI",
    "encodeURIComponent",
    "addEventListener",
    "alert",
    "atob",
    "blur",
    "btoa",
    "clearInterval",
    "clearTimeout",
    "close",
    "confirm",
    "dispatchEvent",
    "fetch",
    "find",
    "focus",
    "getComputedStyle",
    "getSelection",
    "matchMedia",
    "moveBy",
    "moveTo",
    "open",
    "openDialog",
    "postMessage",
    "print",
    "prompt",
    "removeEventListener",
    "requestAnimationFrame",
    "resizeBy",
    "resizeTo",
    "scroll",
    "scrollBy",
    "scrollByLines",
    "scrollByPages",
    "scrollTo",
    "setInterval",
    "setTimeout",
    "stop",
];

/// Globals passed through untouched.
pub const DIRECT_GLOBALS: &[&str] = &["eval"];

#[derive(Debug)]
enum Slot {
    Blocked,
    Bound(HostValue),
    Direct(HostValue),
    Live,
    Snapshot(Mutex<Option<HostValue>>),
}

pub struct ProtectedView {
    real: Arc<dyn HostWindow>,
    slots: HashMap<String, Slot>,
    /// Values written through the view to non-live names.
    expandos: Mutex<HashMap<String, HostValue>>,
    /// Set when the script was granted `window.close`.
    close_port: Option<Arc<dyn HostPort>>,
}

impl ProtectedView {
    /// Builds a view over the names present on `real` right now.
    pub fn new(real: Arc<dyn HostWindow>, extra_blocked: &[String]) -> Self {
        let mut slots = HashMap::new();
        for name in real.property_names() {
            let slot = if name.starts_with("on") {
                Slot::Live
            } else {
                Slot::Snapshot(Mutex::new(None))
            };
            slots.insert(name, slot);
        }
        for name in BOUND_FUNCTIONS {
            let function = real.get(name);
            if function.is_function() {
                slots.insert(name.to_string(), Slot::Bound(function));
            }
        }
        for name in DIRECT_GLOBALS {
            let value = real.get(name);
            if !value.is_undefined() {
                slots.insert(name.to_string(), Slot::Direct(value));
            }
        }
        let blocked = BLOCKED_GLOBALS.iter().copied().chain(extra_blocked.iter().map(String::as_str));
        for name in blocked {
            slots.insert(name.to_string(), Slot::Blocked);
        }

        Self {
            real,
            slots,
            expandos: Mutex::new(HashMap::new()),
            close_port: None,
        }
    }

    /// Routes `close()` to the host instead of the real global.
    pub(crate) fn with_close_override(mut self, port: Arc<dyn HostPort>) -> Self {
        self.close_port = Some(port);
        self
    }

    /// Whether `close()` is routed to the host.
    pub fn has_close_override(&self) -> bool {
        self.close_port.is_some()
    }

    /// Whether `name` is on the deny-list.
    pub fn is_blocked(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Blocked))
    }

    /// Whether `name` reads through to the live global.
    pub fn is_live(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Live))
    }

    /// Reads a property through the view.
    pub fn get(&self, name: &str) -> HostValue {
        let slot = self.slots.get(name);
        if let Some(Slot::Blocked) = slot {
            return HostValue::Undefined;
        }
        if let Some(value) = lock(&self.expandos).get(name) {
            return value.clone().protect();
        }
        let value = match slot {
            Some(Slot::Bound(function)) | Some(Slot::Direct(function)) => function.clone(),
            Some(Slot::Live) => self.real.get(name),
            Some(Slot::Snapshot(cell)) => {
                let mut cell = lock(cell);
                cell.get_or_insert_with(|| self.real.get(name)).clone()
            }
            Some(Slot::Blocked) | None => HostValue::Undefined,
        };
        value.protect()
    }

    /// Writes a property through the view.
    pub fn set(&self, name: &str, value: HostValue) {
        match self.slots.get(name) {
            Some(Slot::Blocked) => debug!(name, "Ignoring write to blocked global"),
            Some(Slot::Live) => self.real.set(name, value.unprotect()),
            Some(Slot::Snapshot(cell)) => *lock(cell) = Some(value),
            _ => {
                lock(&self.expandos).insert(name.to_string(), value);
            }
        }
    }

    /// Calls a function read through the view.
    pub fn call(&self, name: &str, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        if self.is_blocked(name) {
            return Err(HostError::Blocked(name.to_string()));
        }
        if name == "close" && !lock(&self.expandos).contains_key(name) {
            if let Some(port) = &self.close_port {
                port.send(CoreMessage::TabClose);
                return Ok(HostValue::Undefined);
            }
        }
        let function = self.get(name);
        if !function.is_function() {
            return Err(HostError::NotCallable(name.to_string()));
        }
        let args = args.into_iter().map(HostValue::unprotect).collect();
        self.real
            .call_value(&function, HostValue::Window, args)
            .map(HostValue::protect)
    }

    /// The global object this view wraps.
    pub fn real(&self) -> &Arc<dyn HostWindow> {
        &self.real
    }
}

impl std::fmt::Debug for ProtectedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectedView")
            .field("slots", &self.slots.len())
            .field("close_override", &self.close_port.is_some())
            .finish()
    }
}

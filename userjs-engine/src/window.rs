//! The page's global object as seen from the engine.

use crate::error::HostError;
use serde_json::Value;

/// Opaque reference to a page object the engine cannot represent as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub u64);

/// A value living in the page.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Json(Value),
    /// A callable, identified by the host.
    ///
    /// The identity belongs to the function value itself: every read of the
    /// same function yields the same identity, whatever name it sits under.
    Function(String),
    Object(ObjectHandle),
    /// The real global object.
    Window,
    /// The protected view standing in for the global object.
    View,
}

impl HostValue {
    /// Wraps anything convertible to JSON.
    pub fn json(value: impl Into<Value>) -> Self {
        Self::Json(value.into())
    }

    /// A function value with the given host identity.
    pub fn function(identity: impl Into<String>) -> Self {
        Self::Function(identity.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Replaces the real global with the protected view.
    pub(crate) fn protect(self) -> Self {
        match self {
            Self::Window => Self::View,
            other => other,
        }
    }

    /// Replaces the protected view with the real global before it reaches the page.
    pub(crate) fn unprotect(self) -> Self {
        match self {
            Self::View => Self::Window,
            other => other,
        }
    }
}

/// The page's global object.
///
/// Implementations are supplied by the embedding host. The engine reads and
/// writes named properties and calls function values it has read.
pub trait HostWindow: Send + Sync {
    /// Names of the own properties present right now.
    fn property_names(&self) -> Vec<String>;

    /// Current value of a property, `Undefined` when absent.
    fn get(&self, name: &str) -> HostValue;

    /// Defines or replaces a property.
    fn set(&self, name: &str, value: HostValue);

    /// Invokes a function value, wherever it is stored now.
    fn call_value(&self, function: &HostValue, this: HostValue, args: Vec<HostValue>) -> Result<HostValue, HostError>;

    /// Calls whatever function is stored under `name` right now, with the
    /// global as `this`.
    fn call(&self, name: &str, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        let function = self.get(name);
        if !function.is_function() {
            return Err(HostError::NotCallable(name.to_string()));
        }
        self.call_value(&function, HostValue::Window, args)
    }

    /// Wraps raw bytes in a blob and returns its object URL.
    fn create_object_url(&self, data: &[u8]) -> String;
}

/// In-memory window for tests and the replay tool.
pub mod mock {
    use super::*;
    use crate::lock;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// A native function of the mock global.
    pub fn native(name: &str) -> HostValue {
        HostValue::function(format!("native:{name}"))
    }

    /// Records every call and blob-URL creation.
    #[derive(Debug, Default)]
    pub struct MockWindow {
        props: Mutex<BTreeMap<String, HostValue>>,
        calls: Mutex<Vec<(String, Vec<HostValue>)>>,
        blobs: Mutex<Vec<Vec<u8>>>,
        next_blob: AtomicU64,
    }

    impl MockWindow {
        /// An empty global object.
        pub fn new() -> Self {
            Self::default()
        }

        /// A global object carrying the usual browser names.
        pub fn with_defaults() -> Self {
            let window = Self::new();
            for name in [
                "addEventListener",
                "removeEventListener",
                "dispatchEvent",
                "setTimeout",
                "clearTimeout",
                "setInterval",
                "clearInterval",
                "requestAnimationFrame",
                "alert",
                "confirm",
                "prompt",
                "atob",
                "btoa",
                "encodeURIComponent",
                "decodeURIComponent",
                "parseInt",
                "parseFloat",
                "fetch",
                "open",
                "close",
                "focus",
                "blur",
                "scrollTo",
                "getComputedStyle",
                "eval",
            ] {
                window.define(name, native(name));
            }
            window.define("window", HostValue::Window);
            window.define("self", HostValue::Window);
            window.define("top", HostValue::Window);
            window.define("document", HostValue::Object(ObjectHandle(1)));
            window.define("location", HostValue::json("https://example.org/"));
            window.define("innerWidth", HostValue::json(1280));
            window.define("onload", HostValue::json(Value::Null));
            window.define("onmessage", HostValue::json(Value::Null));
            window.define("chrome", HostValue::Object(ObjectHandle(2)));
            window
        }

        /// Defines or replaces a global property.
        pub fn define(&self, name: &str, value: HostValue) {
            lock(&self.props).insert(name.to_string(), value);
        }

        /// Deletes a global property.
        pub fn remove(&self, name: &str) {
            lock(&self.props).remove(name);
        }

        /// Identities of the functions invoked so far, with their arguments.
        pub fn calls(&self) -> Vec<(String, Vec<HostValue>)> {
            lock(&self.calls).clone()
        }

        /// Payloads passed to `create_object_url`, in order.
        pub fn blobs(&self) -> Vec<Vec<u8>> {
            lock(&self.blobs).clone()
        }
    }

    impl HostWindow for MockWindow {
        fn property_names(&self) -> Vec<String> {
            lock(&self.props).keys().cloned().collect()
        }

        fn get(&self, name: &str) -> HostValue {
            lock(&self.props).get(name).cloned().unwrap_or_default()
        }

        fn set(&self, name: &str, value: HostValue) {
            self.define(name, value);
        }

        fn call_value(
            &self,
            function: &HostValue,
            _this: HostValue,
            args: Vec<HostValue>,
        ) -> Result<HostValue, HostError> {
            let HostValue::Function(identity) = function else {
                return Err(HostError::NotCallable(format!("{function:?}")));
            };
            lock(&self.calls).push((identity.clone(), args));
            Ok(HostValue::Undefined)
        }

        fn create_object_url(&self, data: &[u8]) -> String {
            lock(&self.blobs).push(data.to_vec());
            let n = self.next_blob.fetch_add(1, Ordering::Relaxed) + 1;
            format!("blob:mock/{n}")
        }
    }

}

//! Assembly of one script into an injectable unit.
//!
//! The unit is the body of a function whose parameters are the sandbox
//! bindings. The body copies every parameter into a scope object, opens a
//! `with` block on it, inlines the script's dependencies, then calls the
//! script's own source as a nested function with the incoming `this`:
//!
//! ```text
//! var __userjs_scope__ = {};
//! __userjs_scope__["window"] = window;
//! __userjs_scope__["GM_info"] = GM_info;
//! with (__userjs_scope__) {
//! <require 1>
//! ;
//! !function () {
//! <source>
//! }.call(this);
//! }
//! ```

use crate::sandbox::{Binding, Sandbox, ThisBinding};
use std::collections::HashMap;
use tracing::debug;
use userjs_bridge::InjectMessage;

const SCOPE: &str = "__userjs_scope__";

/// Prefix of the per-injection global the host installs the function under.
pub const NOTIFY_PREFIX: &str = "userjs_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableUnit {
    pub element_id: String,
    pub notify_id: String,
    pub arg_names: Vec<String>,
    pub code: String,
}

impl ExecutableUnit {
    pub fn to_message(&self) -> InjectMessage {
        InjectMessage {
            element_id: self.element_id.clone(),
            arg_names: self.arg_names.clone(),
            code: self.code.clone(),
            notify_id: self.notify_id.clone(),
        }
    }
}

/// An assembled unit together with the values its parameters receive.
#[derive(Debug, Clone)]
pub struct PreparedScript {
    pub unit: ExecutableUnit,
    pub sandbox: Sandbox,
}

impl PreparedScript {
    /// Positional arguments, in the order of `unit.arg_names`.
    pub fn args(&self) -> Vec<Binding> {
        self.sandbox.binding_values()
    }

    pub fn this(&self) -> ThisBinding {
        self.sandbox.this_binding()
    }

    pub fn script_name(&self) -> String {
        self.sandbox.script().display_name()
    }
}

/// Assembles a script's source and dependencies against its sandbox.
///
/// `requires` maps resolved dependency URLs to their source; dependencies
/// without source are skipped.
pub fn assemble(sandbox: Sandbox, source: &str, requires: &HashMap<String, String>) -> PreparedScript {
    let arg_names = sandbox.binding_names();
    let script = sandbox.script();

    let mut code = format!("var {SCOPE} = {{}};\n");
    for name in &arg_names {
        code.push_str(&format!("{SCOPE}[\"{name}\"] = {name};\n"));
    }
    code.push_str(&format!("with ({SCOPE}) {{\n"));
    for url in &script.meta.require {
        let key = script.resolve_path(url);
        match requires.get(key) {
            Some(dependency) => {
                code.push_str(dependency);
                code.push_str("\n;\n");
            }
            None => debug!(script_id = %script.id, require = %key, "Skipping dependency without source"),
        }
    }
    code.push_str("!function () {\n");
    code.push_str(source);
    code.push_str("\n}.call(this);\n}");

    let id = uuid::Uuid::new_v4().simple().to_string();
    let unit = ExecutableUnit {
        element_id: format!("{NOTIFY_PREFIX}el_{id}"),
        notify_id: format!("{NOTIFY_PREFIX}{id}"),
        arg_names,
        code,
    };
    PreparedScript { unit, sandbox }
}

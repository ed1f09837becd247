//! Execution of injected script bodies.

use crate::assembler::PreparedScript;
use crate::error::ScriptError;

/// Runs an injected script function inside the page.
///
/// The host has already installed the function named by the unit's
/// `notify_id`; the interpreter calls it with the prepared positional
/// arguments and `this` binding.
pub trait PageInterpreter: Send + Sync {
    fn invoke(&self, script: &PreparedScript) -> Result<(), ScriptError>;
}

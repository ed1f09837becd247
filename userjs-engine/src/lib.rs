//! In-page userscript engine.
//!
//! Receives script descriptors from the privileged host, builds a
//! capability-restricted sandbox per script, assembles each script into
//! one injectable unit, and runs scripts phase by phase as the document
//! loads.
//!
//! The page's global object and interpreter sit behind the `HostWindow`
//! and `PageInterpreter` traits. The engine never evaluates script text;
//! it produces closure source plus parameter bindings and lets the host
//! inject them.
//!
//! ```text
//! host --LoadScripts--> Session --> Scheduler --(per script)--> SandboxBuilder
//!                                                                    |
//! host <------Inject------------- assembler <------------------------+
//! host --Injected-----> Session --> PageInterpreter::invoke(bindings, this)
//! GM_* calls --> Sandbox::call --> capabilities --> HostPort / collaborators
//! ```

pub mod assembler;
pub mod capabilities;
pub mod collaborators;
mod commands;
mod config;
mod context;
mod error;
mod external;
pub mod interpreter;
mod resource_cache;
pub mod sandbox;
pub mod scheduler;
mod session;
mod value_store;
pub mod window;

pub use assembler::{assemble, ExecutableUnit, PreparedScript};
pub use capabilities::{Arg, GmReturn, RequestHandle, ScriptCallback, StylePromise, TabHandle};
pub use collaborators::{
    Collaborators, Detached, DownloadManager, DownloadRequest, Handlers, HttpRequest,
    NotificationCenter, NotificationRequest, RequestMultiplexer, TabManager, TabRequest,
};
pub use commands::{command_key, CommandRegistry};
pub use config::EngineConfig;
pub use context::EngineContext;
pub use error::{CapabilityError, ConfigError, EngineError, ExternalError, HostError, ScriptError};
pub use external::ExternalApi;
pub use interpreter::PageInterpreter;
pub use resource_cache::ResourceCache;
pub use sandbox::{
    Binding, Capability, GmObject, GrantSet, ProtectedView, Sandbox, SandboxBuilder, ThisBinding,
    WindowBinding,
};
pub use scheduler::{ReadyState, Scheduler};
pub use session::{ScriptFailure, Session, SessionBuilder};
pub use value_store::{decode_value, encode_value, ValueDecodeError, ValueStore};
pub use window::{HostValue, HostWindow, ObjectHandle};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

//! Per-script capability sandboxes.
//!
//! A sandbox holds the window a script sees and its GM object. Scripts
//! declaring no grants (or only `none`) see the real global object; every
//! other script sees a [`ProtectedView`] and only the GM functions it
//! declared. GM functions are reachable only through [`Sandbox::call`].

mod gm;
mod grants;
mod view;

pub use gm::{Binding, GmObject};
pub use grants::{Capability, GrantSet};
pub use view::{ProtectedView, BLOCKED_GLOBALS, BOUND_FUNCTIONS, DIRECT_GLOBALS};

use crate::capabilities::{self, Arg, GmReturn};
use crate::context::EngineContext;
use crate::error::{CapabilityError, HostError};
use crate::lock;
use crate::window::{HostValue, HostWindow};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::debug;
use userjs_types::ScriptDescriptor;

/// The window a script sees.
#[derive(Clone)]
pub enum WindowBinding {
    /// The real global object.
    Real(Arc<dyn HostWindow>),
    Protected(Arc<ProtectedView>),
}

impl WindowBinding {
    /// Whether this binding is the given global object itself.
    pub fn is_real(&self, window: &Arc<dyn HostWindow>) -> bool {
        match self {
            Self::Real(real) => Arc::ptr_eq(real, window),
            Self::Protected(_) => false,
        }
    }

    pub fn as_view(&self) -> Option<&ProtectedView> {
        match self {
            Self::Protected(view) => Some(view),
            Self::Real(_) => None,
        }
    }

    pub fn get(&self, name: &str) -> HostValue {
        match self {
            Self::Real(real) => real.get(name),
            Self::Protected(view) => view.get(name),
        }
    }

    pub fn set(&self, name: &str, value: HostValue) {
        match self {
            Self::Real(real) => real.set(name, value),
            Self::Protected(view) => view.set(name, value),
        }
    }

    pub fn call(&self, name: &str, args: Vec<HostValue>) -> Result<HostValue, HostError> {
        match self {
            Self::Real(real) => real.call(name, args),
            Self::Protected(view) => view.call(name, args),
        }
    }
}

impl fmt::Debug for WindowBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(_) => f.write_str("WindowBinding::Real"),
            Self::Protected(view) => f.debug_tuple("WindowBinding::Protected").field(view).finish(),
        }
    }
}

/// `this` of the script body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisBinding {
    GmObject,
    RealWindow,
}

/// Builds sandboxes against one engine context.
#[derive(Clone)]
pub struct SandboxBuilder {
    ctx: Arc<EngineContext>,
}

impl SandboxBuilder {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Builds a fresh sandbox. Never fails, whatever the script header holds.
    ///
    /// The script gets a value mapping if the host sent none for it.
    pub fn build(&self, script: Arc<ScriptDescriptor>, window: Arc<dyn HostWindow>) -> Sandbox {
        self.ctx.values().register_script(script.id);
        let grants = GrantSet::from_grants(script.meta.grant.as_slice());
        let binding = if grants.is_unwrapped() {
            WindowBinding::Real(window.clone())
        } else {
            let mut view = ProtectedView::new(window.clone(), &self.ctx.config().blocked_globals);
            if grants.contains(Capability::WindowClose) {
                view = view.with_close_override(self.ctx.port().clone());
            }
            WindowBinding::Protected(Arc::new(view))
        };

        let mut gm = GmObject::default();
        for capability in grants.iter() {
            let Some(name) = capability.binding_name() else { continue };
            let value = match capability {
                Capability::UnsafeWindow => Binding::Window(WindowBinding::Real(window.clone())),
                Capability::Info => Binding::Info(capabilities::info::script_info(&self.ctx, &script, &grants)),
                other => Binding::Function(other),
            };
            gm.insert(name, value);
        }

        debug!(
            script_id = %script.id,
            unwrapped = grants.is_unwrapped(),
            bindings = gm.len(),
            "Sandbox built"
        );

        Sandbox {
            inner: Arc::new(SandboxInner {
                script,
                grants,
                window: binding,
                real: window,
                gm,
                ctx: self.ctx.clone(),
                resource_urls: Mutex::new(HashMap::new()),
            }),
        }
    }
}

/// One script's execution context. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Sandbox {
    inner: Arc<SandboxInner>,
}

struct SandboxInner {
    script: Arc<ScriptDescriptor>,
    grants: GrantSet,
    window: WindowBinding,
    real: Arc<dyn HostWindow>,
    gm: GmObject,
    ctx: Arc<EngineContext>,
    /// Blob URLs created for resources, keyed by resolved path.
    resource_urls: Mutex<HashMap<String, String>>,
}

impl Sandbox {
    pub fn script(&self) -> &ScriptDescriptor {
        &self.inner.script
    }

    pub fn grants(&self) -> &GrantSet {
        &self.inner.grants
    }

    /// The `window` parameter of the script.
    pub fn window(&self) -> &WindowBinding {
        &self.inner.window
    }

    pub fn gm(&self) -> &GmObject {
        &self.inner.gm
    }

    pub fn this_binding(&self) -> ThisBinding {
        if self.inner.grants.is_unwrapped() {
            ThisBinding::RealWindow
        } else {
            ThisBinding::GmObject
        }
    }

    /// Parameter names: `window`, then every GM binding.
    pub fn binding_names(&self) -> Vec<String> {
        std::iter::once("window")
            .chain(self.inner.gm.names())
            .map(str::to_string)
            .collect()
    }

    /// Parameter values, in the same order as [`Sandbox::binding_names`].
    pub fn binding_values(&self) -> Vec<Binding> {
        std::iter::once(Binding::Window(self.inner.window.clone()))
            .chain(self.inner.gm.iter().map(|(_, b)| b.clone()))
            .collect()
    }

    /// Calls a GM function by binding name.
    pub fn call(&self, name: &str, args: Vec<Arg>) -> Result<GmReturn, CapabilityError> {
        match self.inner.gm.get(name) {
            Some(Binding::Function(capability)) => capabilities::invoke(self, *capability, args),
            Some(_) => Err(CapabilityError::NotCallable(name.to_string())),
            None => Err(CapabilityError::Unavailable(name.to_string())),
        }
    }

    pub(crate) fn ctx(&self) -> &EngineContext {
        &self.inner.ctx
    }

    pub(crate) fn real_window(&self) -> &Arc<dyn HostWindow> {
        &self.inner.real
    }

    pub(crate) fn cached_resource_url(&self, key: &str) -> Option<String> {
        lock(&self.inner.resource_urls).get(key).cloned()
    }

    pub(crate) fn remember_resource_url(&self, key: &str, url: &str) {
        lock(&self.inner.resource_urls).insert(key.to_string(), url.to_string());
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox")
            .field("script_id", &self.inner.script.id)
            .field("window", &self.inner.window)
            .field("bindings", &self.binding_names())
            .finish()
    }
}

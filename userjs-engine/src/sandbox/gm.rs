//! The read-only object holding a script's GM bindings.

use super::grants::Capability;
use super::WindowBinding;
use serde_json::Value;

/// One binding of the GM object.
#[derive(Debug, Clone)]
pub enum Binding {
    /// The window a script sees (`window` parameter or `unsafeWindow`).
    Window(WindowBinding),
    /// `GM_info`.
    Info(Value),
    /// A GM function, called through `Sandbox::call`.
    Function(Capability),
}

/// Bindings in insertion order. Cannot be modified once built.
#[derive(Debug, Clone, Default)]
pub struct GmObject {
    bindings: Vec<(&'static str, Binding)>,
}

impl GmObject {
    pub(crate) fn insert(&mut self, name: &'static str, binding: Binding) {
        if !self.contains(name) {
            self.bindings.push((name, binding));
        }
    }

    /// Binding exposed under `name`, if granted.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|(n, _)| *n == name).map(|(_, b)| b)
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Binding names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|(n, _)| *n)
    }

    /// Name and binding pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Binding)> {
        self.bindings.iter().map(|(n, b)| (*n, b))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

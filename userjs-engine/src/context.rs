//! Services shared by a session and every sandbox it builds.

use crate::collaborators::Collaborators;
use crate::commands::CommandRegistry;
use crate::config::EngineConfig;
use crate::lock;
use crate::resource_cache::ResourceCache;
use crate::value_store::ValueStore;
use std::sync::{Arc, Mutex};
use userjs_bridge::{CallbackRegistry, HostPort};

pub struct EngineContext {
    config: EngineConfig,
    port: Arc<dyn HostPort>,
    callbacks: CallbackRegistry,
    commands: CommandRegistry,
    values: ValueStore,
    resources: ResourceCache,
    collaborators: Collaborators,
    host_version: Mutex<String>,
}

impl EngineContext {
    /// Context for one page session.
    pub fn new(config: EngineConfig, port: Arc<dyn HostPort>, collaborators: Collaborators) -> Self {
        let values = ValueStore::new(port.clone(), config.debug);
        Self {
            config,
            port,
            callbacks: CallbackRegistry::new(),
            commands: CommandRegistry::new(),
            values,
            resources: ResourceCache::new(),
            collaborators,
            host_version: Mutex::new(String::new()),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Outbound channel to the host.
    pub fn port(&self) -> &Arc<dyn HostPort> {
        &self.port
    }

    /// Continuations waiting for host replies.
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Registered menu commands.
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Per-script value cache.
    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    /// Decoded resource payloads.
    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    /// Request, notification, tab and download handlers.
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Host version from the last `LoadScripts`.
    pub fn host_version(&self) -> String {
        lock(&self.host_version).clone()
    }

    pub(crate) fn set_host_version(&self, version: &str) {
        *lock(&self.host_version) = version.to_string();
    }
}

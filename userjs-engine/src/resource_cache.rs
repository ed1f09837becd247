//! Resource bodies sent by the host, keyed by resolved URL.

use crate::lock;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes and stores base64 bodies. Entries that fail to decode are dropped.
    /// Returns the number of entries stored.
    pub fn load_base64(&self, cache: HashMap<String, String>) -> usize {
        let mut entries = lock(&self.entries);
        let mut stored = 0;
        for (key, body) in cache {
            match STANDARD.decode(body.trim()) {
                Ok(bytes) => {
                    entries.insert(key, bytes.into());
                    stored += 1;
                }
                Err(e) => warn!(resource = %key, error = %e, "Dropping undecodable resource"),
            }
        }
        stored
    }

    pub fn insert(&self, key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        lock(&self.entries).insert(key.into(), bytes.into());
    }

    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        lock(&self.entries).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

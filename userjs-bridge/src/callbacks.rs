//! Correlation of outbound requests with host replies.
//!
//! Replies cross a message-passing boundary, so duplicates and late
//! arrivals are expected. Ids come from a monotonic counter and are never
//! reused within a session; a stale reply can only ever miss, never hit
//! someone else's continuation.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;
use userjs_types::RequestId;

/// Code to run when the reply to a request arrives.
pub type Continuation = Box<dyn FnOnce(Value) + Send>;

struct Entry {
    continuation: Continuation,
    one_shot: bool,
}

/// Registry of in-flight requests awaiting a host reply.
pub struct CallbackRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<RequestId, Entry>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores a continuation under the next request id.
    pub fn register<F>(&self, continuation: F) -> RequestId
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.insert(Box::new(continuation), false)
    }

    /// Like `register`, for host-initiated callbacks: the entry is dropped
    /// from the registry right before its single invocation.
    pub fn register_one_shot<F>(&self, continuation: F) -> RequestId
    where
        F: FnOnce(Value) + Send + 'static,
    {
        self.insert(Box::new(continuation), true)
    }

    /// Removes the continuation for `id` and invokes it with `payload`.
    ///
    /// Returns `false` when the id is unknown (already resolved or never
    /// registered); that case is not an error.
    pub fn resolve(&self, id: RequestId, payload: Value) -> bool {
        // The lock is released before the continuation runs, so it may
        // register follow-up requests.
        let entry = self.entries().remove(&id);
        match entry {
            Some(entry) => {
                debug!(request_id = %id, one_shot = entry.one_shot, "Resolving callback");
                (entry.continuation)(payload);
                true
            }
            None => {
                debug!(request_id = %id, "Dropping reply for unknown request id");
                false
            }
        }
    }

    /// Number of requests still awaiting a reply.
    pub fn pending(&self) -> usize {
        self.entries().len()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.entries().contains_key(&id)
    }

    fn insert(&self, continuation: Continuation, one_shot: bool) -> RequestId {
        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().insert(id, Entry { continuation, one_shot });
        id
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<RequestId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn ids_are_monotonic() {
        let registry = CallbackRegistry::new();
        let a = registry.register(|_| {});
        let b = registry.register_one_shot(|_| {});
        let c = registry.register(|_| {});
        assert!(a < b && b < c);
    }

    #[test]
    fn ids_are_not_recycled_after_resolve() {
        let registry = CallbackRegistry::new();
        let first = registry.register(|_| {});
        assert!(registry.resolve(first, Value::Null));
        let second = registry.register(|_| {});
        assert_ne!(first, second);
    }

    #[test]
    fn one_shot_is_gone_while_running() {
        let registry = Arc::new(CallbackRegistry::new());
        let seen_pending = Arc::new(AtomicUsize::new(usize::MAX));
        let (inner, seen) = (Arc::clone(&registry), Arc::clone(&seen_pending));
        let id = registry.register_one_shot(move |_| {
            seen.store(inner.pending(), Ordering::SeqCst);
        });
        assert!(registry.resolve(id, Value::Null));
        assert_eq!(seen_pending.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn continuation_may_register_follow_up() {
        let registry = Arc::new(CallbackRegistry::new());
        let inner = Arc::clone(&registry);
        let id = registry.register(move |_| {
            inner.register(|_| {});
        });
        assert!(registry.resolve(id, Value::Null));
        assert_eq!(registry.pending(), 1);
    }
}

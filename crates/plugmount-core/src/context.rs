//! The host context that plugins are mounted into.
//!
//! A [`Context`] is owned by the host application and shared with the loader
//! through an `Arc` for the duration of a mount. It offers two things:
//!
//! - A string-keyed map of type-erased values. Mount handlers assign their
//!   exports here (`context.insert("logger", logger)`), later plugins read
//!   them back with [`Context::get`].
//! - A broadcast notification channel. The loader never emits on its own;
//!   hosts typically emit `"plugins.ready"` from their after-mount hook.
//!
//! The loader mounts strictly one bean at a time, so the lock guarding the
//! value map is never contended by the loader itself.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

/// Type-erased value stored on a [`Context`].
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Event name conventionally emitted once all plugins are mounted.
pub const PLUGINS_READY: &str = "plugins.ready";

const EVENT_CAPACITY: usize = 64;

/// Shared, caller-owned object that plugins are mounted into.
pub struct Context {
    name: String,
    values: RwLock<HashMap<String, ContextValue>>,
    events: broadcast::Sender<String>,
}

impl Context {
    /// Creates an empty, unnamed context.
    pub fn new() -> Self {
        Self::named("")
    }

    /// Creates an empty context with a display name.
    pub fn named(name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name: name.into(),
            values: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Returns the context's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.insert_arc(key, Arc::new(value));
    }

    /// Stores an already type-erased value under `key`.
    pub fn insert_arc(&self, key: impl Into<String>, value: ContextValue) {
        self.values.write().insert(key.into(), value);
    }

    /// Returns the value under `key` if it exists and has type `T`.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.values.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Returns the raw type-erased value under `key`.
    pub fn get_any(&self, key: &str) -> Option<ContextValue> {
        self.values.read().get(key).cloned()
    }

    /// Removes and returns the value under `key`.
    pub fn remove(&self, key: &str) -> Option<ContextValue> {
        self.values.write().remove(key)
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Returns all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns `true` if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Emits a named notification to every current subscriber.
    ///
    /// Returns the number of subscribers that received it; emitting with no
    /// subscribers is not an error.
    pub fn emit(&self, event: impl Into<String>) -> usize {
        self.events.send(event.into()).unwrap_or(0)
    }

    /// Subscribes to notifications emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

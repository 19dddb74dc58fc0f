//! Keyed, type-erased store for results passed between stages.
//!
//! Stages never mutate the context directly. They read an immutable
//! snapshot and record writes in their own [`ContextWrites`] buffer, which
//! the orchestrator merges once the stage (or a fan-out join) finishes.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use inspect_types::StageId;

type Value = Arc<dyn Any + Send + Sync>;

/// Typed handle for a context entry named `<kind>_<stageId>`.
pub struct ContextKey<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// Key for data of `kind` owned by stage `id`.
    pub fn scoped(kind: &str, id: StageId) -> Self {
        Self::new(format!("{kind}_{id}"))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextKey").field(&self.name).finish()
    }
}

impl<T> fmt::Display for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Run-scoped result store, cleared at the start of every full run.
#[derive(Default, Clone)]
pub struct SharedContext {
    values: HashMap<String, Value>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set<T: Any + Send + Sync>(&mut self, key: &ContextKey<T>, value: T) {
        self.values.insert(key.name.clone(), Arc::new(value));
    }

    /// The value under `key`, or `None` if it is absent or of another type.
    pub fn get<T: Any + Send + Sync>(&self, key: &ContextKey<T>) -> Option<Arc<T>> {
        let value = self.values.get(&key.name)?;
        Arc::clone(value).downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entry names in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Apply a stage's buffered writes, overwriting existing entries.
    pub fn merge(&mut self, writes: ContextWrites) {
        for (name, value) in writes.entries {
            self.values.insert(name, value);
        }
    }
}

impl fmt::Debug for SharedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedContext")
            .field("keys", &self.keys())
            .finish()
    }
}

/// Writes made by one stage execution, pending merge.
#[derive(Default)]
pub struct ContextWrites {
    entries: Vec<(String, Value)>,
}

impl ContextWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer `value` under `key`. A second write to the same key replaces
    /// the first.
    pub fn set<T: Any + Send + Sync>(&mut self, key: &ContextKey<T>, value: T) {
        let value: Value = Arc::new(value);
        match self.entries.iter_mut().find(|(name, _)| *name == key.name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.name.clone(), value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ContextWrites {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}

//! Delta-tracking attribute storage.
//!
//! An [`AttributeStore`] records which names were upserted or removed since the
//! last checkpoint so a save only has to replicate those. All operations run
//! under a single mutex owned by the store; encoders take the same guard for
//! the whole encode so they observe a consistent snapshot.

use std::collections::{HashMap, HashSet};

use parking_lot::{Mutex, MutexGuard};

use crate::value::AttributeValue;

/// Attribute changes since the last delta checkpoint.
///
/// `updated` entries are applied before `removed` names, so a name present in
/// both lists ends up removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeDelta {
    /// Names added or modified, with their current values.
    pub updated: Vec<(String, AttributeValue)>,
    /// Names removed.
    pub removed: Vec<String>,
}

impl AttributeDelta {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

/// State guarded by the store mutex.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeState {
    values: HashMap<String, AttributeValue>,
    dirty: HashSet<String>,
    removed: HashSet<String>,
}

impl AttributeState {
    fn set(&mut self, name: String, value: AttributeValue) {
        if value.is_null() {
            self.remove(&name);
            return;
        }
        self.removed.remove(&name);
        self.dirty.insert(name.clone());
        self.values.insert(name, value);
    }

    fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        let previous = self.values.remove(name);
        let was_dirty = self.dirty.remove(name);
        // Absent and never written: nothing to replicate.
        if previous.is_some() || was_dirty {
            self.removed.insert(name.to_string());
        }
        previous
    }

    pub(crate) fn entries(&self) -> Vec<(String, AttributeValue)> {
        let mut entries: Vec<_> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub(crate) fn delta(&self) -> AttributeDelta {
        let mut updated: Vec<_> = self
            .dirty
            .iter()
            .filter_map(|name| self.values.get(name).map(|v| (name.clone(), v.clone())))
            .collect();
        updated.sort_by(|a, b| a.0.cmp(&b.0));

        let mut removed: Vec<_> = self.removed.iter().cloned().collect();
        removed.sort();

        AttributeDelta { updated, removed }
    }

    pub(crate) fn clear_delta(&mut self) {
        self.dirty.clear();
        self.removed.clear();
    }

    fn has_delta(&self) -> bool {
        !self.dirty.is_empty() || !self.removed.is_empty()
    }
}

/// Mapping from attribute name to value with delta tracking.
#[derive(Debug, Default)]
pub struct AttributeStore {
    state: Mutex<AttributeState>,
}

impl AttributeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing entries with an empty delta.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for (name, value) in entries {
                state.set(name.into(), value.into());
            }
            state.clear_delta();
        }
        store
    }

    /// Insert or overwrite an attribute. A `Null` value removes it.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.state.lock().set(name.into(), value.into());
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.state.lock().remove(name)
    }

    pub fn get_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.state.lock().values.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().values.contains_key(name)
    }

    /// Names present at the time of the call.
    pub fn attribute_names(&self) -> std::vec::IntoIter<String> {
        let names: Vec<String> = self.state.lock().values.keys().cloned().collect();
        names.into_iter()
    }

    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().values.is_empty()
    }

    /// Forget all tracked changes without touching stored values.
    pub fn clear_delta(&self) {
        self.state.lock().clear_delta();
    }

    pub fn has_delta(&self) -> bool {
        self.state.lock().has_delta()
    }

    /// All entries, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, AttributeValue)> {
        self.state.lock().entries()
    }

    /// Changes since the last checkpoint.
    pub fn delta(&self) -> AttributeDelta {
        self.state.lock().delta()
    }

    /// Apply a delta received from another node, then clear the delta.
    pub fn apply_delta(&self, delta: &AttributeDelta) {
        let mut state = self.state.lock();
        for (name, value) in &delta.updated {
            state.set(name.clone(), value.clone());
        }
        for name in &delta.removed {
            state.remove(name);
        }
        state.clear_delta();
    }

    /// Mark a written delta as replicated.
    ///
    /// Only entries that still match what was written are cleared; changes made
    /// after `delta` was taken stay pending for the next save.
    pub fn commit(&self, delta: &AttributeDelta) {
        let mut state = self.state.lock();
        for (name, value) in &delta.updated {
            if state.values.get(name).is_some_and(|v| v.is_identical(value)) {
                state.dirty.remove(name);
            }
        }
        for name in &delta.removed {
            if !state.values.contains_key(name) {
                state.removed.remove(name);
            }
        }
    }

    /// Hold the store lock for the duration of an encode.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AttributeState> {
        self.state.lock()
    }
}

impl Clone for AttributeStore {
    fn clone(&self) -> Self {
        Self {
            state: Mutex::new(self.state.lock().clone()),
        }
    }
}

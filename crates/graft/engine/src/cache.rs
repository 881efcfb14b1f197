//! Per-scope cache layers.
//!
//! A scope's caches are overlays: a local map plus a tombstone set,
//! with misses falling through to the parent scope. Tombstones are how
//! a reset "deletes" an inherited entry without touching the ancestor
//! that owns it.

use graft_types::ModuleName;
use std::collections::{HashMap, HashSet};

/// What one layer knows about a name.
pub(crate) enum Probe<V> {
    /// Present in this layer.
    Hit(V),
    /// Deleted in this layer; stop falling through.
    Deleted,
    /// Unknown here; ask the parent.
    Miss,
}

#[derive(Default)]
pub(crate) struct CacheLayer<V> {
    entries: HashMap<ModuleName, V>,
    tombstones: HashSet<ModuleName>,
}

impl<V: Clone> CacheLayer<V> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            tombstones: HashSet::new(),
        }
    }

    pub(crate) fn probe(&self, name: &ModuleName) -> Probe<V> {
        if let Some(value) = self.entries.get(name) {
            return Probe::Hit(value.clone());
        }
        if self.tombstones.contains(name) {
            return Probe::Deleted;
        }
        Probe::Miss
    }

    /// Inserting clears any tombstone: the name now has a fresh local
    /// value again.
    pub(crate) fn insert(&mut self, name: ModuleName, value: V) {
        self.tombstones.remove(&name);
        self.entries.insert(name, value);
    }

    pub(crate) fn tombstone(&mut self, name: ModuleName) {
        self.entries.remove(&name);
        self.tombstones.insert(name);
    }

    /// Names with a value in this layer, sorted for stable iteration.
    pub(crate) fn local_names(&self) -> Vec<ModuleName> {
        let mut names: Vec<ModuleName> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn get_local(&self, name: &ModuleName) -> Option<&V> {
        self.entries.get(name)
    }
}

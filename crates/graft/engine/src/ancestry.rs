//! Ancestor lookup over the dependency graph.
//!
//! "Ancestors" of a module are the modules that depend on it,
//! transitively: the ones whose cached singletons go stale when it is
//! reset. The index is rebuilt from the registry snapshot each time a
//! reset needs it, so late definitions are always seen.

use crate::registry::{AliasTable, ModuleRegistry};
use graft_types::ModuleName;
use std::collections::{HashMap, HashSet, VecDeque};

/// Reverse dependency index: name → the modules that directly list it.
#[derive(Default)]
pub struct DependencyIndex {
    dependents: HashMap<ModuleName, Vec<ModuleName>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `name` depends on each of `dependencies`.
    pub fn add(&mut self, name: &ModuleName, dependencies: &[ModuleName]) {
        for dependency in dependencies {
            self.dependents
                .entry(dependency.clone())
                .or_default()
                .push(name.clone());
        }
    }

    /// Every module that transitively depends on `name`, breadth-first.
    /// `name` itself is not included.
    pub fn ancestors(&self, name: &ModuleName) -> Vec<ModuleName> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name.clone());
        let mut queue: VecDeque<ModuleName> = VecDeque::new();
        queue.push_back(name.clone());

        while let Some(current) = queue.pop_front() {
            if let Some(direct) = self.dependents.get(&current) {
                for dependent in direct {
                    if seen.insert(dependent.clone()) {
                        found.push(dependent.clone());
                        queue.push_back(dependent.clone());
                    }
                }
            }
        }
        found
    }

    /// Snapshot the registry into an index. Only plain `Name` entries
    /// contribute edges (collectives, self-references, and reset
    /// markers never make one module depend on another), and each edge
    /// is recorded against canonical names.
    pub fn from_registry(registry: &ModuleRegistry, aliases: &AliasTable) -> Self {
        let mut index = Self::new();
        for module in registry.modules() {
            let dependencies: Vec<ModuleName> = module
                .dependency_names()
                .iter()
                .map(|name| aliases.dealias(name))
                .collect();
            index.add(&module.name, &dependencies);
        }
        index
    }
}

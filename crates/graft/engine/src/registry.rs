//! Module registry and alias table, shared by a whole scope tree.
//!
//! Both are append-only: definitions and aliases accumulate for the
//! life of the tree and are never removed. Resets fork caches, never
//! the registry.

use crate::module::Module;
use graft_types::{GraftError, GraftResult, ModuleName};
use std::collections::{HashMap, HashSet};

// ── Module registry ──────────────────────────────────────────────────

/// Name → module definition storage, plus the set of names that have
/// been collectivized (needed by the reset safety check).
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<ModuleName, Module>,
    collectivized: HashSet<ModuleName>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Empty names and duplicate names are rejected;
    /// a duplicate is never silently merged over an earlier definition.
    pub fn define(&mut self, module: Module) -> GraftResult<()> {
        if module.name.as_str().is_empty() {
            return Err(GraftError::EmptyModuleName);
        }
        if self.modules.contains_key(&module.name) {
            return Err(GraftError::DuplicateModule(module.name));
        }

        tracing::info!(
            module = %module.name,
            dependencies = module.dependencies.len(),
            "Module defined"
        );
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    /// Merge-if-absent registration for modules arriving through the
    /// loader chain. Returns whether the module was actually inserted.
    pub fn adopt(&mut self, module: Module) -> bool {
        if self.modules.contains_key(&module.name) {
            return false;
        }
        tracing::debug!(module = %module.name, "Module adopted from loader");
        self.modules.insert(module.name.clone(), module);
        true
    }

    pub fn get(&self, name: &ModuleName) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &ModuleName) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    /// Sorted, for stable dumps.
    pub fn module_names(&self) -> Vec<ModuleName> {
        let mut names: Vec<ModuleName> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn mark_collectivized(&mut self, name: ModuleName) {
        tracing::debug!(module = %name, "Module collectivized");
        self.collectivized.insert(name);
    }

    pub fn is_collectivized(&self, name: &ModuleName) -> bool {
        self.collectivized.contains(name)
    }
}

// ── Alias table ──────────────────────────────────────────────────────

/// Alternate identifier → canonical module name.
///
/// Populated when the loader chain resolves an identifier to a module
/// whose declared name differs from what was asked for.
#[derive(Default)]
pub struct AliasTable {
    aliases: HashMap<ModuleName, ModuleName>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, alias: ModuleName, canonical: ModuleName) {
        if alias == canonical {
            return;
        }
        tracing::debug!(alias = %alias, canonical = %canonical, "Alias recorded");
        self.aliases.insert(alias, canonical);
    }

    /// One dealiasing step.
    pub fn canonical(&self, name: &ModuleName) -> Option<&ModuleName> {
        self.aliases.get(name)
    }

    /// Follow the alias chain to its end. Guards against accidental
    /// alias loops by stopping at the first repeated name.
    pub fn dealias(&self, name: &ModuleName) -> ModuleName {
        let mut seen = HashSet::new();
        let mut current = name.clone();
        while let Some(next) = self.aliases.get(&current) {
            if !seen.insert(current.clone()) {
                break;
            }
            current = next.clone();
        }
        current
    }

    /// Every alias key pointing at `canonical`.
    pub fn aliases_of(&self, canonical: &ModuleName) -> Vec<ModuleName> {
        self.aliases
            .iter()
            .filter(|(_, target)| *target == canonical)
            .map(|(alias, _)| alias.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

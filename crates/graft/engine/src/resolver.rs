//! Resolution dispatch and singleton construction.
//!
//! `resolve` tries, in order: the self reference, the collective
//! store, the singleton cache, a registered module, the alias table,
//! then the loader chain. Only when all of those decline does the
//! identifier count as unknown.

use crate::loader::{Loaded, LoaderFn};
use crate::module::{Module, Resolved};
use crate::scope::Scope;
use graft_types::{DependencySpec, GraftError, GraftResult, ModuleName, Singleton, Value};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

// ── Generation stack ─────────────────────────────────────────────────

/// Modules currently mid-construction, tree-wide. The vector keeps the
/// chain for error reporting; the set makes membership checks cheap.
pub(crate) struct GenerationStack {
    names: Vec<ModuleName>,
    active: HashSet<ModuleName>,
}

impl GenerationStack {
    pub(crate) fn new() -> Self {
        Self {
            names: Vec::new(),
            active: HashSet::new(),
        }
    }

    pub(crate) fn is_generating(&self, name: &ModuleName) -> bool {
        self.active.contains(name)
    }

    pub(crate) fn push(&mut self, name: ModuleName) {
        self.active.insert(name.clone());
        self.names.push(name);
    }

    pub(crate) fn pop(&mut self) {
        if let Some(name) = self.names.pop() {
            self.active.remove(&name);
        }
    }

    /// The module whose factory is running right now, if any.
    pub(crate) fn current(&self) -> Option<ModuleName> {
        self.names.last().cloned()
    }

    /// The in-flight chain extended with the name that closed it.
    pub(crate) fn chain_with(&self, name: &ModuleName) -> Vec<ModuleName> {
        let mut chain = self.names.clone();
        chain.push(name.clone());
        chain
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────

impl Scope {
    /// Resolve one dependency entry against this scope.
    pub fn resolve(&self, spec: &DependencySpec) -> GraftResult<Resolved> {
        match spec {
            DependencySpec::SelfRef => Ok(Resolved::Scope(self.clone())),
            DependencySpec::Collective(handle) => {
                self.resolve_collective(handle).map(Resolved::Collective)
            }
            DependencySpec::Name(name) => self.resolve_name(name).map(Resolved::Singleton),
            DependencySpec::Reset(name) => Err(GraftError::ResetOutsideUsing(name.clone())),
        }
    }

    /// Resolve a whole dependency list, in order.
    pub fn resolve_all(&self, specs: &[DependencySpec]) -> GraftResult<Vec<Resolved>> {
        specs.iter().map(|spec| self.resolve(spec)).collect()
    }

    /// Resolve a name to its singleton, constructing it on first use.
    pub fn get(&self, name: impl Into<ModuleName>) -> GraftResult<Singleton> {
        self.resolve_name(&name.into())
    }

    pub(crate) fn resolve_name(&self, name: &ModuleName) -> GraftResult<Singleton> {
        if let Some(singleton) = self.lookup_singleton(name) {
            trace!(module = %name, scope = %self.id().short(), "Singleton cache hit");
            return Ok(singleton);
        }

        let module = self.shared().registry.borrow().get(name).cloned();
        if let Some(module) = module {
            return self.construct(&module);
        }

        let canonical = self.shared().aliases.borrow().canonical(name).cloned();
        if let Some(canonical) = canonical {
            trace!(alias = %name, canonical = %canonical, "Following alias");
            return self.resolve_name(&canonical);
        }

        if let Some(singleton) = self.consult_loaders(name)? {
            return Ok(singleton);
        }

        Err(GraftError::UnknownModule {
            identifier: name.to_string(),
            scope: self.id().clone(),
        })
    }

    // ── Construction ─────────────────────────────────────────────────

    fn construct(&self, module: &Module) -> GraftResult<Singleton> {
        {
            let generation = self.shared().generation.borrow();
            if generation.is_generating(&module.name) {
                return Err(GraftError::CircularDependency {
                    stack: generation.chain_with(&module.name),
                });
            }
        }

        self.shared().generation.borrow_mut().push(module.name.clone());
        let produced = self.construct_inner(module);
        // pop on the error path too, so a failed factory can be retried
        self.shared().generation.borrow_mut().pop();
        let value = produced?;

        if !value.is_constructible() {
            return Err(GraftError::NotConstructible {
                module: module.name.clone(),
                kind: value.kind(),
            });
        }

        let singleton = Singleton::stamp(value, Some(module.name.clone()));
        self.insert_singleton(module.name.clone(), singleton.clone());
        debug!(
            module = %module.name,
            scope = %self.id().short(),
            singleton = %singleton.id.short(),
            "Module constructed"
        );
        Ok(singleton)
    }

    fn construct_inner(&self, module: &Module) -> GraftResult<Value> {
        let resolved = self.resolve_all(&module.dependencies)?;
        (module.factory)(&resolved)
    }

    // ── Loader chain ─────────────────────────────────────────────────

    /// Offer the identifier to each loader in registration order; the
    /// first one to produce something wins.
    fn consult_loaders(&self, name: &ModuleName) -> GraftResult<Option<Singleton>> {
        let loaders: Vec<LoaderFn> = self.shared().loaders.borrow().clone();
        for loader in &loaders {
            if let Some(loaded) = loader(self.shared().fallback.as_ref(), name, self)? {
                return self.adopt_loaded(name, loaded).map(Some);
            }
        }
        Ok(None)
    }

    fn adopt_loaded(&self, requested: &ModuleName, loaded: Loaded) -> GraftResult<Singleton> {
        match loaded {
            Loaded::Plain(value) => {
                // loader products are trusted as-is, cached under the
                // identifier that was asked for
                let singleton = Singleton::stamp(value, None);
                self.insert_singleton(requested.clone(), singleton.clone());
                debug!(identifier = %requested, "Loader supplied a plain value");
                Ok(singleton)
            }
            Loaded::Module(module) => {
                let canonical = module.name.clone();
                self.shared().registry.borrow_mut().adopt(module);
                if canonical != *requested {
                    let tail = requested.as_str().rsplit('/').next().unwrap_or_default();
                    if tail != canonical.as_str() {
                        warn!(
                            requested = %requested,
                            canonical = %canonical,
                            "Loaded module name differs from requested identifier"
                        );
                    }
                    self.shared()
                        .aliases
                        .borrow_mut()
                        .record(requested.clone(), canonical.clone());
                }
                self.resolve_name(&canonical)
            }
        }
    }
}

//! Scopes: nodes in the reset tree.
//!
//! A scope is a view over the tree-wide registry plus its own cache
//! overlays. Resolving against a scope fills its caches; resetting
//! forks a child whose overlays tombstone the invalidated names.
//! Ancestors are never mutated by a reset, which is what makes a
//! failed or abandoned `using` call harmless.

use crate::ancestry::DependencyIndex;
use crate::cache::CacheLayer;
use crate::loader::{FallbackFn, Loaded, LoaderFn};
use crate::module::{Exported, Module, Resolved};
use crate::registry::{AliasTable, ModuleRegistry};
use crate::resolver::GenerationStack;
use graft_types::{
    DependencySpec, GraftError, GraftResult, ModuleName, ScopeId, Singleton, Value,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

// ── Tree-shared state ────────────────────────────────────────────────

/// State every scope in one tree shares: definitions, aliases, the
/// loader chain, and the in-flight construction stack.
pub(crate) struct TreeShared {
    pub(crate) registry: RefCell<ModuleRegistry>,
    pub(crate) aliases: RefCell<AliasTable>,
    pub(crate) loaders: RefCell<Vec<LoaderFn>>,
    pub(crate) generation: RefCell<GenerationStack>,
    pub(crate) fallback: Option<FallbackFn>,
}

pub(crate) struct ScopeCore {
    pub(crate) id: ScopeId,
    pub(crate) shared: Rc<TreeShared>,
    pub(crate) parent: Option<Scope>,
    pub(crate) singletons: RefCell<CacheLayer<Singleton>>,
    pub(crate) collectives: RefCell<CacheLayer<Value>>,
    /// Names invalidated when this scope was forked (the full reset
    /// closure), kept for dump labelling.
    pub(crate) resets: Vec<ModuleName>,
    /// Weak links so dumps can walk downward without keeping dead
    /// scopes alive.
    pub(crate) children: RefCell<Vec<Weak<ScopeCore>>>,
}

// ── Scope handle ─────────────────────────────────────────────────────

/// A handle onto one node of the reset tree. Cloning shares the node.
#[derive(Clone)]
pub struct Scope {
    pub(crate) core: Rc<ScopeCore>,
}

impl Scope {
    /// A fresh root scope with an empty registry and no loaders.
    pub fn new() -> Self {
        Self::root(None)
    }

    /// A root scope whose loaders receive the given fallback lookup.
    pub fn with_fallback(fallback: impl Fn(&ModuleName) -> Option<Loaded> + 'static) -> Self {
        Self::root(Some(Rc::new(fallback)))
    }

    fn root(fallback: Option<FallbackFn>) -> Self {
        let shared = Rc::new(TreeShared {
            registry: RefCell::new(ModuleRegistry::new()),
            aliases: RefCell::new(AliasTable::new()),
            loaders: RefCell::new(Vec::new()),
            generation: RefCell::new(GenerationStack::new()),
            fallback,
        });
        let core = Rc::new(ScopeCore {
            id: ScopeId::generate(),
            shared,
            parent: None,
            singletons: RefCell::new(CacheLayer::new()),
            collectives: RefCell::new(CacheLayer::new()),
            resets: Vec::new(),
            children: RefCell::new(Vec::new()),
        });
        tracing::debug!(scope = %core.id.short(), "Root scope created");
        Scope { core }
    }

    pub fn id(&self) -> &ScopeId {
        &self.core.id
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.core.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.core.parent.is_none()
    }

    /// Whether two handles point at the same scope node.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn shared(&self) -> &TreeShared {
        &self.core.shared
    }

    // ── Definition ───────────────────────────────────────────────────

    /// Register a module on the tree-wide registry.
    pub fn define<F>(
        &self,
        name: impl Into<ModuleName>,
        dependencies: Vec<DependencySpec>,
        factory: F,
    ) -> GraftResult<()>
    where
        F: Fn(&[Resolved]) -> GraftResult<Value> + 'static,
    {
        let module = Module::new(name, dependencies, factory);
        self.shared().registry.borrow_mut().define(module)
    }

    /// `define` plus immediate eager resolution. The returned bundle
    /// carries the module definition so another scope tree's loader can
    /// round-trip it.
    pub fn export<F>(
        &self,
        name: impl Into<ModuleName>,
        dependencies: Vec<DependencySpec>,
        factory: F,
    ) -> GraftResult<Exported>
    where
        F: Fn(&[Resolved]) -> GraftResult<Value> + 'static,
    {
        let name: ModuleName = name.into();
        self.define(name.clone(), dependencies, factory)?;
        let singleton = self.get(name.clone())?;
        let module = self
            .shared()
            .registry
            .borrow()
            .get(&name)
            .cloned()
            .ok_or_else(|| GraftError::UnknownModule {
                identifier: name.to_string(),
                scope: self.id().clone(),
            })?;
        Ok(Exported { module, singleton })
    }

    /// Names currently registered, sorted.
    pub fn module_names(&self) -> Vec<ModuleName> {
        self.shared().registry.borrow().module_names()
    }

    // ── Dependency list helpers ──────────────────────────────────────

    /// A reset marker for `using` dependency lists.
    pub fn reset(&self, name: impl Into<ModuleName>) -> DependencySpec {
        DependencySpec::reset(name)
    }

    /// A collective handle over `template`.
    pub fn collective(&self, template: Value) -> DependencySpec {
        DependencySpec::collective(template)
    }

    /// Append a loader to the tree-wide chain.
    pub fn use_loader<F>(&self, loader: F)
    where
        F: Fn(Option<&FallbackFn>, &ModuleName, &Scope) -> GraftResult<Option<Loaded>> + 'static,
    {
        self.shared().loaders.borrow_mut().push(Rc::new(loader));
        tracing::debug!(scope = %self.id().short(), "Loader registered");
    }

    // ── using and the reset cascade ──────────────────────────────────

    /// Resolve `dependencies` and hand them to `continuation` along
    /// with the scope they were resolved against.
    ///
    /// Without reset markers that is the current scope. With resets, a
    /// child scope is forked first: every reset target is dealiased and
    /// recorded as a root reset, the closure of transitive dependents
    /// is computed, cached members are tombstoned in the child (root
    /// targets also lose their collective slot), and resolution runs
    /// against the child.
    pub fn using<R>(
        &self,
        dependencies: &[DependencySpec],
        continuation: impl FnOnce(&Scope, &[Resolved]) -> GraftResult<R>,
    ) -> GraftResult<R> {
        let mut plain = Vec::with_capacity(dependencies.len());
        let mut roots: Vec<ModuleName> = Vec::new();
        {
            let aliases = self.shared().aliases.borrow();
            for dependency in dependencies {
                match dependency {
                    DependencySpec::Reset(target) => {
                        let canonical = aliases.dealias(target);
                        if !roots.contains(&canonical) {
                            roots.push(canonical.clone());
                        }
                        plain.push(DependencySpec::Name(canonical));
                    }
                    other => plain.push(other.clone()),
                }
            }
        }

        if roots.is_empty() {
            let resolved = self.resolve_all(&plain)?;
            return continuation(self, &resolved);
        }

        let (index, closure) = self.reset_closure(&roots);
        let cached: Vec<ModuleName> = closure
            .iter()
            .filter(|name| self.sees_singleton(name))
            .cloned()
            .collect();
        self.check_reset_safety(&roots, &cached, &index)?;

        let child = self.fork_for_resets(&roots, &closure, &cached);
        let resolved = child.resolve_all(&plain)?;
        continuation(&child, &resolved)
    }

    /// Root resets plus every module that transitively depends on one,
    /// in discovery order.
    fn reset_closure(&self, roots: &[ModuleName]) -> (DependencyIndex, Vec<ModuleName>) {
        let index = {
            let registry = self.shared().registry.borrow();
            let aliases = self.shared().aliases.borrow();
            DependencyIndex::from_registry(&registry, &aliases)
        };

        let mut closure = Vec::new();
        let mut seen = HashSet::new();
        for root in roots {
            if seen.insert(root.clone()) {
                closure.push(root.clone());
            }
        }
        for root in roots {
            for ancestor in index.ancestors(root) {
                if seen.insert(ancestor.clone()) {
                    closure.push(ancestor);
                }
            }
        }
        (index, closure)
    }

    /// A collectivized module may be reset directly, but never swept up
    /// as a dependent: its previously returned shared methods would
    /// keep pointing at the old instance while fresh resolutions got a
    /// new one.
    fn check_reset_safety(
        &self,
        roots: &[ModuleName],
        cached: &[ModuleName],
        index: &DependencyIndex,
    ) -> GraftResult<()> {
        let registry = self.shared().registry.borrow();
        for root in roots {
            for ancestor in index.ancestors(root) {
                if roots.contains(&ancestor) || !cached.contains(&ancestor) {
                    continue;
                }
                if registry.is_collectivized(&ancestor) {
                    return Err(GraftError::CollectivizedReset {
                        module: ancestor,
                        reset: root.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn fork_for_resets(
        &self,
        roots: &[ModuleName],
        closure: &[ModuleName],
        cached: &[ModuleName],
    ) -> Scope {
        let mut singletons = CacheLayer::new();
        let mut collectives = CacheLayer::new();
        {
            let aliases = self.shared().aliases.borrow();
            for name in cached {
                singletons.tombstone(name.clone());
                for alias in aliases.aliases_of(name) {
                    singletons.tombstone(alias);
                }
            }
            for name in roots {
                collectives.tombstone(name.clone());
                for alias in aliases.aliases_of(name) {
                    collectives.tombstone(alias);
                }
            }
        }

        let core = Rc::new(ScopeCore {
            id: ScopeId::generate(),
            shared: Rc::clone(&self.core.shared),
            parent: Some(self.clone()),
            singletons: RefCell::new(singletons),
            collectives: RefCell::new(collectives),
            resets: closure.to_vec(),
            children: RefCell::new(Vec::new()),
        });
        self.core.children.borrow_mut().push(Rc::downgrade(&core));
        let child = Scope { core };

        tracing::info!(
            parent = %self.id().short(),
            child = %child.id().short(),
            resets = ?closure.iter().map(ModuleName::as_str).collect::<Vec<_>>(),
            "Scope forked for reset"
        );
        child
    }

    // ── Cache access ─────────────────────────────────────────────────

    /// Walk this scope and its ancestors for a cached singleton. A
    /// tombstone stops the walk: the name was reset here.
    pub(crate) fn lookup_singleton(&self, name: &ModuleName) -> Option<Singleton> {
        use crate::cache::Probe;
        let mut current = Some(self);
        while let Some(scope) = current {
            match scope.core.singletons.borrow().probe(name) {
                Probe::Hit(singleton) => return Some(singleton),
                Probe::Deleted => return None,
                Probe::Miss => {}
            }
            current = scope.core.parent.as_ref();
        }
        None
    }

    pub(crate) fn sees_singleton(&self, name: &ModuleName) -> bool {
        self.lookup_singleton(name).is_some()
    }

    pub(crate) fn insert_singleton(&self, name: ModuleName, singleton: Singleton) {
        self.core.singletons.borrow_mut().insert(name, singleton);
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.core.id)
            .field("root", &self.is_root())
            .finish()
    }
}

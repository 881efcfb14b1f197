//! Module definitions and the factory contract.
//!
//! A module is a name, an ordered dependency list, and a factory. The
//! factory sees its dependencies already resolved, in declaration
//! order, and returns the one value the scope will cache for it.

use crate::scope::Scope;
use chrono::{DateTime, Utc};
use graft_types::{DependencySpec, GraftResult, ModuleName, Singleton, Value};
use std::fmt;
use std::rc::Rc;

/// Factory signature: resolved dependencies in, one produced value out.
pub type FactoryFn = Rc<dyn Fn(&[Resolved]) -> GraftResult<Value>>;

/// One resolved dependency, as handed to a factory or a `using`
/// continuation.
#[derive(Clone, Debug)]
pub enum Resolved {
    /// A constructed module product or a plain loader value.
    Singleton(Singleton),
    /// The per-consumer clone of a collective template.
    Collective(Value),
    /// The scope the resolution ran against (from a `SelfRef` entry).
    Scope(Scope),
}

impl Resolved {
    /// The underlying value, when there is one. `Scope` entries carry
    /// no value.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Resolved::Singleton(singleton) => Some(&singleton.value),
            Resolved::Collective(value) => Some(value),
            Resolved::Scope(_) => None,
        }
    }

    pub fn singleton(&self) -> Option<&Singleton> {
        match self {
            Resolved::Singleton(singleton) => Some(singleton),
            _ => None,
        }
    }

    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Resolved::Scope(scope) => Some(scope),
            _ => None,
        }
    }
}

/// A registered unit of construction logic.
#[derive(Clone)]
pub struct Module {
    /// Canonical name, unique within one registry.
    pub name: ModuleName,
    /// Resolved in declaration order before the factory runs.
    pub dependencies: Vec<DependencySpec>,
    /// Builds the module's value from its resolved dependencies.
    pub factory: FactoryFn,
    /// When this definition was registered.
    pub defined_at: DateTime<Utc>,
}

impl Module {
    pub fn new(
        name: impl Into<ModuleName>,
        dependencies: Vec<DependencySpec>,
        factory: impl Fn(&[Resolved]) -> GraftResult<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            dependencies,
            factory: Rc::new(factory),
            defined_at: Utc::now(),
        }
    }

    /// Direct dependency names, dealiasing left to the caller.
    pub fn dependency_names(&self) -> Vec<ModuleName> {
        self.dependencies
            .iter()
            .filter_map(|dep| match dep {
                DependencySpec::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("factory", &"<factory>")
            .field("defined_at", &self.defined_at)
            .finish()
    }
}

/// A constructed singleton bundled with its module definition.
///
/// This is what `export` returns, and the transport a foreign scope
/// tree's loader hands back to round-trip the module into its own
/// registry.
#[derive(Clone, Debug)]
pub struct Exported {
    pub module: Module,
    pub singleton: Singleton,
}

impl Exported {
    pub fn value(&self) -> &Value {
        &self.singleton.value
    }
}

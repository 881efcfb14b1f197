//! Dependency specs: the entries of a dependency list.
//!
//! One exhaustive tagged union instead of stringly-typed markers, so
//! every resolution site matches all four shapes or does not compile.

use crate::{ModuleName, Value};

/// An opaque reference to a collective template.
///
/// The handle itself carries no identity: the clone a module receives is
/// keyed by the consuming module's name, so two modules listing the same
/// handle still get independent clones.
#[derive(Clone, Debug)]
pub struct CollectiveHandle {
    template: Value,
}

impl CollectiveHandle {
    pub fn new(template: Value) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Value {
        &self.template
    }
}

/// One entry in a dependency list.
#[derive(Clone, Debug)]
pub enum DependencySpec {
    /// A module name, alias, or loader identifier.
    Name(ModuleName),
    /// The scope doing the resolving; lets a factory introspect or
    /// trigger resets from within construction.
    SelfRef,
    /// A per-consumer clone of a shared template.
    Collective(CollectiveHandle),
    /// Invalidate the named module (and its dependents) for one
    /// `using` call. Only meaningful inside a `using` dependency list.
    Reset(ModuleName),
}

impl DependencySpec {
    pub fn name(name: impl Into<ModuleName>) -> Self {
        Self::Name(name.into())
    }

    pub fn reset(name: impl Into<ModuleName>) -> Self {
        Self::Reset(name.into())
    }

    pub fn collective(template: Value) -> Self {
        Self::Collective(CollectiveHandle::new(template))
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset(_))
    }
}

impl From<&str> for DependencySpec {
    fn from(name: &str) -> Self {
        Self::Name(name.into())
    }
}

impl From<String> for DependencySpec {
    fn from(name: String) -> Self {
        Self::Name(name.into())
    }
}

impl From<ModuleName> for DependencySpec {
    fn from(name: ModuleName) -> Self {
        Self::Name(name)
    }
}

impl From<CollectiveHandle> for DependencySpec {
    fn from(handle: CollectiveHandle) -> Self {
        Self::Collective(handle)
    }
}

//! The loader seam: resolving identifiers the registry doesn't know.
//!
//! Loaders are consulted in registration order; the first one that
//! returns `Some` wins. A loader can hand back a plain value (cached
//! under the requested identifier as-is) or a module produced by a
//! different scope tree's `export`, which gets adopted into the local
//! registry and aliased.

use crate::module::{Exported, Module};
use crate::scope::Scope;
use graft_types::{GraftResult, ModuleName, Value};
use std::rc::Rc;

/// What a loader resolved an identifier to.
#[derive(Clone, Debug)]
pub enum Loaded {
    /// An externally constructed value, trusted as-is.
    Plain(Value),
    /// A module definition round-tripped from another scope tree.
    Module(Module),
}

impl From<Exported> for Loaded {
    fn from(exported: Exported) -> Self {
        Loaded::Module(exported.module)
    }
}

/// Root-configured external lookup, handed to every loader invocation
/// so loaders can defer to whatever the host environment provides.
pub type FallbackFn = Rc<dyn Fn(&ModuleName) -> Option<Loaded>>;

/// One loader in the chain. `Ok(None)` means "not mine, ask the next
/// one"; errors abort the chain immediately.
pub type LoaderFn =
    Rc<dyn Fn(Option<&FallbackFn>, &ModuleName, &Scope) -> GraftResult<Option<Loaded>>>;

//! Graft engine: lazy module composition with resettable scopes.
//!
//! A [`Scope`] owns a registry of named modules. Resolving a name runs
//! its factory once and memoizes the result; later resolutions reuse
//! the cached singleton. Resets never mutate in place: they fork a
//! child scope whose cache overlays invalidate the reset modules and
//! everything that transitively depends on them, while the parent keeps
//! serving its own snapshots.
//!
//! ```rust
//! use graft_engine::Scope;
//! use graft_types::Value;
//!
//! # fn main() -> graft_types::GraftResult<()> {
//! let scope = Scope::new();
//! scope.define("greeting", vec![], |_| Ok(Value::text("hello")))?;
//! assert_eq!(scope.get("greeting")?.value.as_text(), Some("hello"));
//!
//! // fork a child with a fresh greeting; the parent keeps the old one
//! scope.using(&[scope.reset("greeting"), "greeting".into()], |child, resolved| {
//!     assert!(!child.ptr_eq(&scope));
//!     assert_eq!(resolved[1].value().and_then(Value::as_text), Some("hello"));
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod ancestry;
mod cache;
mod collective;
mod collectivize;
pub mod dump;
pub mod harness;
pub mod loader;
pub mod module;
pub mod registry;
mod resolver;
pub mod scope;

pub use ancestry::DependencyIndex;
pub use dump::ScopeDump;
pub use loader::{FallbackFn, Loaded, LoaderFn};
pub use module::{Exported, FactoryFn, Module, Resolved};
pub use registry::{AliasTable, ModuleRegistry};
pub use scope::Scope;

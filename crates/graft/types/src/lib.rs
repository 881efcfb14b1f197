//! Core Types for the Graft Resolution Engine
//!
//! Graft wires object graphs out of named **modules**: units of
//! construction logic that declare what they depend on and a factory
//! that turns resolved dependencies into one produced value. The engine
//! crate does the wiring; this crate holds the vocabulary both sides of
//! that contract speak.
//!
//! # Key Concepts
//!
//! - **Value**: The dynamic runtime value factories consume and produce.
//!   Collections (`Object`, `List`) and callables (`Function`) are
//!   shared handles; scalars are plain. Deep-cloning a value copies
//!   collection structure and shares everything else.
//! - **DependencySpec**: One entry in a dependency list: a module
//!   `Name`, a `SelfRef` to the resolving scope, a `Collective` handle,
//!   or a `Reset` marker consumed by `using`.
//! - **CollectiveHandle**: An opaque reference to a template object.
//!   Resolving it yields a per-consuming-module clone that survives
//!   singleton resets.
//! - **Singleton**: A constructed value stamped with a fresh identity
//!   tag and a back-reference to the module that produced it.
//! - **GraftError**: Every way definition, resolution, construction, or
//!   a reset can fail. All failures are synchronous and fatal to the
//!   operation that committed them.
//!
//! # Design Principles
//!
//! 1. Factories must produce something usable: a function, an object,
//!    or text. Returning nothing or a bare scalar is an error, not a
//!    silent `Null`.
//! 2. Identity is explicit. Whether a factory re-ran is answered by
//!    comparing `SingletonId`s, never by guessing from value contents.
//! 3. Sharing is single-threaded `Rc` sharing. Values never cross a
//!    thread boundary: resolution is synchronous and runs entirely on
//!    the calling thread.

#![deny(unsafe_code)]

mod dependency;
mod errors;
mod identifiers;
mod singleton;
mod value;

pub use dependency::*;
pub use errors::*;
pub use identifiers::*;
pub use singleton::*;
pub use value::*;

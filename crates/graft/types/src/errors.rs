//! Error types for definition, resolution, construction, and resets.
//!
//! Every failure is synchronous and fatal to the operation that caused
//! it; nothing is retried and nothing is swallowed.

use crate::{ModuleName, ScopeId};

#[derive(Debug, thiserror::Error)]
pub enum GraftError {
    // ── Definition ───────────────────────────────────────────────────
    #[error("Module name may not be empty")]
    EmptyModuleName,

    #[error("Module already defined: {0}")]
    DuplicateModule(ModuleName),

    // ── Resolution ───────────────────────────────────────────────────
    #[error("No module named '{identifier}' is known to scope {}", .scope.short())]
    UnknownModule { identifier: String, scope: ScopeId },

    #[error("Reset marker for '{0}' is only valid inside a using() dependency list")]
    ResetOutsideUsing(ModuleName),

    #[error("Loader failed while resolving '{identifier}': {message}")]
    LoaderFailed { identifier: String, message: String },

    // ── Construction ─────────────────────────────────────────────────
    #[error("Circular dependency: {}", format_stack(.stack))]
    CircularDependency { stack: Vec<ModuleName> },

    #[error(
        "Module '{module}' produced a {kind} value; factories must return a function, object, or string"
    )]
    NotConstructible { module: ModuleName, kind: &'static str },

    #[error("Factory error: {0}")]
    Factory(String),

    // ── Reset safety ─────────────────────────────────────────────────
    #[error(
        "'{module}' has a collectivized singleton and depends on '{reset}'; resetting '{reset}' \
         would strand its shared methods. Split '{module}' so the collectivized part does not \
         depend on '{reset}'"
    )]
    CollectivizedReset { module: ModuleName, reset: ModuleName },

    // ── Values and adapters ──────────────────────────────────────────
    #[error("Expected an object value, found {kind}")]
    NotAnObject { kind: &'static str },

    #[error("Value of kind {kind} is not callable")]
    NotCallable { kind: &'static str },

    #[error("Shared instance has no '{method}' method")]
    MethodNotFound { method: String },

    #[error("Constructor has no 'new' entry and no make-instance function was given")]
    MissingConstructor,
}

pub type GraftResult<T> = Result<T, GraftError>;

fn format_stack(stack: &[ModuleName]) -> String {
    stack
        .iter()
        .map(ModuleName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

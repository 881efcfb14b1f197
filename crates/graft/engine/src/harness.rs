//! A small binding harness for exercising modules in tests and demos.

use crate::module::Resolved;
use crate::scope::Scope;
use graft_types::{DependencySpec, GraftResult};
use tracing::info_span;

/// Run `body` with `dependencies` resolved against `scope`, inside a
/// span labelled with `description`. Reset markers fork exactly as
/// they do in [`Scope::using`], so a case can bind against fresh state
/// without touching its neighbors.
pub fn run<R>(
    description: &str,
    scope: &Scope,
    dependencies: &[DependencySpec],
    body: impl FnOnce(&Scope, &[Resolved]) -> GraftResult<R>,
) -> GraftResult<R> {
    let span = info_span!("case", name = description);
    let _guard = span.enter();
    scope.using(dependencies, body)
}

//! The collective store: per-consumer clones of shared templates.
//!
//! A collective entry in a dependency list hands the consuming module
//! a deep clone of the template, keyed by the consumer's name. The
//! clone outlives the consumer's singleton: reconstructing the module
//! hands back the same clone, with whatever state it accumulated.
//! Only resetting the consumer itself issues a fresh one.

use crate::cache::Probe;
use crate::scope::Scope;
use graft_types::{CollectiveHandle, GraftResult, ModuleName, Value};
use tracing::{debug, trace};

impl Scope {
    pub(crate) fn resolve_collective(&self, handle: &CollectiveHandle) -> GraftResult<Value> {
        let consumer = self.shared().generation.borrow().current();
        let Some(consumer) = consumer else {
            // no module under construction, so there is no identity to
            // key the clone by
            trace!("Collective resolved outside construction; issuing an uncached clone");
            return Ok(handle.template().deep_clone());
        };

        if let Some(existing) = self.lookup_collective(&consumer) {
            trace!(consumer = %consumer, "Collective cache hit");
            return Ok(existing);
        }

        let clone = handle.template().deep_clone();
        self.core
            .collectives
            .borrow_mut()
            .insert(consumer.clone(), clone.clone());
        debug!(consumer = %consumer, scope = %self.id().short(), "Collective clone issued");
        Ok(clone)
    }

    pub(crate) fn lookup_collective(&self, consumer: &ModuleName) -> Option<Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            match scope.core.collectives.borrow().probe(consumer) {
                Probe::Hit(value) => return Some(value),
                Probe::Deleted => return None,
                Probe::Miss => {}
            }
            current = scope.core.parent.as_ref();
        }
        None
    }
}

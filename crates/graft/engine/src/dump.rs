//! Debug snapshots of a scope tree.

use crate::scope::Scope;
use serde::Serialize;
use std::rc::Weak;

/// A serializable snapshot of one scope and its live descendants.
///
/// Singleton labels read `name@id`, tagged ` [reset]` when the name was
/// invalidated at this scope and has been rebuilt here. The registry
/// listing appears only on the root, since definitions are tree-wide.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeDump {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resets: Vec<String>,
    pub singletons: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ScopeDump>,
}

impl Scope {
    /// Snapshot this scope and every descendant still alive.
    pub fn dump(&self) -> ScopeDump {
        let mut singletons = Vec::new();
        {
            let cache = self.core.singletons.borrow();
            for name in cache.local_names() {
                if let Some(singleton) = cache.get_local(&name) {
                    let mut label = format!("{}@{}", name, singleton.id.short());
                    if self.core.resets.contains(&name) {
                        label.push_str(" [reset]");
                    }
                    singletons.push(label);
                }
            }
        }

        let children: Vec<ScopeDump> = self
            .core
            .children
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|core| Scope { core }.dump())
            .collect();

        ScopeDump {
            id: self.id().to_string(),
            modules: self
                .is_root()
                .then(|| self.module_names().iter().map(ToString::to_string).collect()),
            resets: self.core.resets.iter().map(ToString::to_string).collect(),
            singletons,
            children,
        }
    }
}

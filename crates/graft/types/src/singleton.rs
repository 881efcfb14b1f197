//! Stamped cache entries for constructed values.

use crate::{ModuleName, SingletonId, Value};
use chrono::{DateTime, Utc};

/// A constructed value plus its identity stamp.
///
/// Cloning a `Singleton` keeps the stamp, so every resolution of a
/// cached name hands back the same id. A fresh id therefore means the
/// factory ran again.
#[derive(Clone, Debug)]
pub struct Singleton {
    /// Fresh per construction.
    pub id: SingletonId,
    /// The factory product, or a plain loader value.
    pub value: Value,
    /// Back-reference to the producing module. `None` for plain values
    /// that came through the loader chain.
    pub module: Option<ModuleName>,
    /// When construction finished.
    pub constructed_at: DateTime<Utc>,
}

impl Singleton {
    pub fn stamp(value: Value, module: Option<ModuleName>) -> Self {
        Self {
            id: SingletonId::generate(),
            value,
            module,
            constructed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamping_is_fresh_per_call() {
        let one = Singleton::stamp(Value::text("petals"), Some("flower".into()));
        let two = Singleton::stamp(Value::text("petals"), Some("flower".into()));
        assert_ne!(one.id, two.id);
        assert_eq!(one.module, Some(ModuleName::new("flower")));
    }

    #[test]
    fn test_clones_keep_the_stamp() {
        let singleton = Singleton::stamp(Value::text("petals"), None);
        let clone = singleton.clone();
        assert_eq!(singleton.id, clone.id);
        assert!(clone.module.is_none());
    }
}

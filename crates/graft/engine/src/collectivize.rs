//! Collectivize: expose a class's methods as forwarders onto one
//! shared instance.
//!
//! The instance is built lazily and memoized on the collective object
//! itself, under a reserved key minted per `collectivize` call, so
//! every forwarder from one call shares the same instance. Because the
//! handed-out forwarders capture that key, the module that called
//! `collectivize` is marked in the registry: a cascading reset would
//! rebuild the module around a fresh key while old forwarders kept the
//! stale instance alive, so the safety check refuses it.

use crate::scope::Scope;
use graft_types::{FunctionRef, GraftError, GraftResult, ObjectRef, Value};
use std::rc::Rc;
use tracing::debug;

type BuildFn = Rc<dyn Fn() -> GraftResult<Value>>;

impl Scope {
    /// Wrap `constructor`'s instance methods as forwarders onto a
    /// single shared instance stored on `collective`.
    ///
    /// The instance is made by `make_instance(constructor, collective)`
    /// when given, otherwise by calling `constructor.new(collective)`.
    pub fn collectivize(
        &self,
        constructor: &Value,
        collective: &Value,
        make_instance: Option<FunctionRef>,
        methods: &[&str],
    ) -> GraftResult<Value> {
        let ctor_obj = constructor
            .as_object()
            .cloned()
            .ok_or(GraftError::NotAnObject {
                kind: constructor.kind(),
            })?;
        let memo = collective
            .as_object()
            .cloned()
            .ok_or(GraftError::NotAnObject {
                kind: collective.kind(),
            })?;
        if make_instance.is_none() && !ctor_obj.contains_key("new") {
            return Err(GraftError::MissingConstructor);
        }

        let build = make_build(constructor.clone(), collective.clone(), ctor_obj, make_instance);
        let key = format!("collectivized/{}", &uuid::Uuid::new_v4().to_string()[..8]);

        let grafted = ObjectRef::new();
        for method in methods {
            grafted.insert(
                *method,
                make_forwarder(method.to_string(), build.clone(), memo.clone(), key.clone()),
            );
        }

        if let Some(current) = self.shared().generation.borrow().current() {
            self.shared()
                .registry
                .borrow_mut()
                .mark_collectivized(current.clone());
            debug!(module = %current, key = %key, "Module collectivized");
        }

        Ok(Value::Object(grafted))
    }
}

fn make_build(
    constructor: Value,
    collective: Value,
    ctor_obj: ObjectRef,
    make_instance: Option<FunctionRef>,
) -> BuildFn {
    match make_instance {
        Some(factory) => Rc::new(move || {
            factory.call(&[constructor.clone(), collective.clone()])
        }),
        None => Rc::new(move || {
            let new_fn = ctor_obj.get("new").ok_or(GraftError::MissingConstructor)?;
            new_fn.call(&[collective.clone()])
        }),
    }
}

fn make_forwarder(method: String, build: BuildFn, memo: ObjectRef, key: String) -> Value {
    Value::function(move |args| {
        let instance = match memo.get(&key) {
            Some(existing) => existing,
            None => {
                let built = build()?;
                if !matches!(built, Value::Object(_)) {
                    return Err(GraftError::NotAnObject { kind: built.kind() });
                }
                memo.insert(key.clone(), built.clone());
                built
            }
        };
        let target = instance.as_object().ok_or(GraftError::NotAnObject {
            kind: instance.kind(),
        })?;
        // late-bound so the method list never goes stale
        let entry = target
            .get(&method)
            .ok_or_else(|| GraftError::MethodNotFound {
                method: method.clone(),
            })?;
        entry.call(args)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_types::DependencySpec;
    use std::cell::Cell;

    /// A counter "class": `new(collective)` returns an instance whose
    /// methods read and bump a private tally.
    fn make_counter_class(instances: Rc<Cell<i64>>) -> Value {
        let class = ObjectRef::new();
        class.insert(
            "new",
            Value::function(move |_args| {
                instances.set(instances.get() + 1);
                let tally = Rc::new(Cell::new(0i64));
                let instance = ObjectRef::new();
                let bump_tally = Rc::clone(&tally);
                instance.insert(
                    "bump",
                    Value::function(move |_| {
                        bump_tally.set(bump_tally.get() + 1);
                        Ok(Value::Int(bump_tally.get()))
                    }),
                );
                instance.insert(
                    "read",
                    Value::function(move |_| Ok(Value::Int(tally.get()))),
                );
                Ok(Value::Object(instance))
            }),
        );
        Value::Object(class)
    }

    #[test]
    fn test_forwarders_share_one_lazy_instance() {
        let scope = Scope::new();
        let instances = Rc::new(Cell::new(0));
        let class = make_counter_class(Rc::clone(&instances));
        let collective = Value::Object(ObjectRef::new());

        let grafted = scope
            .collectivize(&class, &collective, None, &["bump", "read"])
            .unwrap();
        let grafted = grafted.as_object().cloned().unwrap();

        // nothing built until the first call
        assert_eq!(instances.get(), 0);

        let bump = grafted.get("bump").unwrap();
        let read = grafted.get("read").unwrap();
        assert_eq!(bump.call(&[]).unwrap().as_int(), Some(1));
        assert_eq!(bump.call(&[]).unwrap().as_int(), Some(2));
        assert_eq!(read.call(&[]).unwrap().as_int(), Some(2));
        assert_eq!(instances.get(), 1);
    }

    #[test]
    fn test_make_instance_overrides_the_constructor() {
        let scope = Scope::new();
        let class = Value::Object(ObjectRef::new());
        let collective = Value::Object(ObjectRef::new());

        let make_instance = FunctionRef::new(|_args| {
            let instance = ObjectRef::new();
            instance.insert("greet", Value::function(|_| Ok(Value::text("custom"))));
            Ok(Value::Object(instance))
        });

        let grafted = scope
            .collectivize(&class, &collective, Some(make_instance), &["greet"])
            .unwrap();
        let greet = grafted.as_object().and_then(|obj| obj.get("greet")).unwrap();
        assert_eq!(greet.call(&[]).unwrap().as_text(), Some("custom"));
    }

    #[test]
    fn test_missing_constructor_is_rejected() {
        let scope = Scope::new();
        let class = Value::Object(ObjectRef::new());
        let collective = Value::Object(ObjectRef::new());
        let err = scope
            .collectivize(&class, &collective, None, &["anything"])
            .unwrap_err();
        assert!(matches!(err, GraftError::MissingConstructor));
    }

    #[test]
    fn test_non_object_arguments_are_rejected() {
        let scope = Scope::new();
        let collective = Value::Object(ObjectRef::new());
        let err = scope
            .collectivize(&Value::text("not a class"), &collective, None, &[])
            .unwrap_err();
        assert!(matches!(err, GraftError::NotAnObject { kind: "text" }));
    }

    #[test]
    fn test_unknown_method_surfaces_on_call() {
        let scope = Scope::new();
        let instances = Rc::new(Cell::new(0));
        let class = make_counter_class(instances);
        let collective = Value::Object(ObjectRef::new());

        let grafted = scope
            .collectivize(&class, &collective, None, &["vanish"])
            .unwrap();
        let vanish = grafted.as_object().and_then(|obj| obj.get("vanish")).unwrap();
        let err = vanish.call(&[]).unwrap_err();
        assert!(matches!(err, GraftError::MethodNotFound { method } if method == "vanish"));
    }

    #[test]
    fn test_cascading_reset_over_a_collectivized_module_is_refused() {
        let scope = Scope::new();
        let instances = Rc::new(Cell::new(0));
        let class = make_counter_class(Rc::clone(&instances));
        let template = Value::Object(ObjectRef::new());

        scope
            .define("store", vec![], |_| Ok(Value::text("store")))
            .unwrap();
        scope
            .define(
                "ledger",
                vec![
                    DependencySpec::SelfRef,
                    DependencySpec::name("store"),
                    DependencySpec::collective(template),
                ],
                move |deps| {
                    let inner = deps[0]
                        .scope()
                        .ok_or_else(|| GraftError::Factory("missing scope".into()))?;
                    let clone = deps[2]
                        .value()
                        .cloned()
                        .ok_or_else(|| GraftError::Factory("missing collective".into()))?;
                    inner.collectivize(&class, &clone, None, &["bump", "read"])
                },
            )
            .unwrap();

        let _ = scope.get("ledger").unwrap();

        let err = scope
            .using(&[scope.reset("store")], |_, _| Ok(()))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("has a collectivized singleton"));
        assert!(message.contains("ledger"));
        assert!(message.contains("store"));
    }

    #[test]
    fn test_direct_reset_of_a_collectivized_module_is_allowed() {
        let scope = Scope::new();
        let instances = Rc::new(Cell::new(0));
        let class = make_counter_class(Rc::clone(&instances));
        let template = Value::Object(ObjectRef::new());

        scope
            .define(
                "ledger",
                vec![
                    DependencySpec::SelfRef,
                    DependencySpec::collective(template),
                ],
                move |deps| {
                    let inner = deps[0]
                        .scope()
                        .ok_or_else(|| GraftError::Factory("missing scope".into()))?;
                    let clone = deps[1]
                        .value()
                        .cloned()
                        .ok_or_else(|| GraftError::Factory("missing collective".into()))?;
                    inner.collectivize(&class, &clone, None, &["bump"])
                },
            )
            .unwrap();

        let before = scope.get("ledger").unwrap();
        scope
            .using(&[scope.reset("ledger"), "ledger".into()], |_, resolved| {
                let after = resolved[1].singleton().unwrap();
                assert_ne!(before.id, after.id);
                Ok(())
            })
            .unwrap();
    }
}

//! End-to-end test: define a layered module graph -> resolve lazily ->
//! reset a foundation module -> verify the cascade and parent isolation.
//!
//! Exercises the full composition lifecycle the way an application
//! embeds it: settings feed a connection, the connection feeds a
//! repository, the repository feeds a service.

use graft_engine::{Resolved, Scope};
use graft_types::{DependencySpec, GraftError, ObjectRef, Value};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct BuildCounts {
    settings: Rc<Cell<u32>>,
    connection: Rc<Cell<u32>>,
    repository: Rc<Cell<u32>>,
    service: Rc<Cell<u32>>,
}

/// Wires settings -> connection -> repository -> service, counting how
/// many times each factory runs.
fn define_app_graph(scope: &Scope) -> BuildCounts {
    let counts = BuildCounts {
        settings: Rc::new(Cell::new(0)),
        connection: Rc::new(Cell::new(0)),
        repository: Rc::new(Cell::new(0)),
        service: Rc::new(Cell::new(0)),
    };

    let tally = Rc::clone(&counts.settings);
    scope
        .define("settings", vec![], move |_| {
            tally.set(tally.get() + 1);
            let settings = ObjectRef::new();
            settings.insert("dsn", Value::text("postgres://localhost/app"));
            Ok(Value::Object(settings))
        })
        .unwrap();

    let tally = Rc::clone(&counts.connection);
    scope
        .define(
            "connection",
            vec![DependencySpec::name("settings")],
            move |deps| {
                tally.set(tally.get() + 1);
                let dsn = deps[0]
                    .value()
                    .and_then(Value::as_object)
                    .and_then(|settings| settings.get("dsn"))
                    .ok_or_else(|| GraftError::Factory("settings lost their dsn".into()))?;
                let connection = ObjectRef::new();
                connection.insert("dsn", dsn);
                Ok(Value::Object(connection))
            },
        )
        .unwrap();

    let tally = Rc::clone(&counts.repository);
    scope
        .define(
            "repository",
            vec![DependencySpec::name("connection")],
            move |_| {
                tally.set(tally.get() + 1);
                let repository = ObjectRef::new();
                repository.insert("table", Value::text("plants"));
                Ok(Value::Object(repository))
            },
        )
        .unwrap();

    let tally = Rc::clone(&counts.service);
    scope
        .define(
            "service",
            vec![DependencySpec::name("repository")],
            move |_| {
                tally.set(tally.get() + 1);
                Ok(Value::text("service-ready"))
            },
        )
        .unwrap();

    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn resolution_is_lazy_and_memoized_across_the_graph() {
    let scope = Scope::new();
    let counts = define_app_graph(&scope);

    // defining runs nothing
    assert_eq!(counts.service.get(), 0);

    let first = scope.get("service").unwrap();
    assert_eq!(counts.settings.get(), 1);
    assert_eq!(counts.connection.get(), 1);
    assert_eq!(counts.repository.get(), 1);
    assert_eq!(counts.service.get(), 1);

    // every factory ran exactly once, no matter how often we ask
    let second = scope.get("service").unwrap();
    assert_eq!(first.id, second.id);
    let _ = scope.get("repository").unwrap();
    assert_eq!(counts.repository.get(), 1);
    assert_eq!(counts.service.get(), 1);
}

#[test]
fn resetting_the_foundation_rebuilds_the_whole_chain_in_a_child() {
    let scope = Scope::new();
    let counts = define_app_graph(&scope);

    let service_before = scope.get("service").unwrap();
    let settings_before = scope.get("settings").unwrap();

    scope
        .using(
            &[scope.reset("settings"), "service".into()],
            |child, resolved| {
                // the whole chain was rebuilt, once each, in the child
                assert_eq!(counts.settings.get(), 2);
                assert_eq!(counts.connection.get(), 2);
                assert_eq!(counts.repository.get(), 2);
                assert_eq!(counts.service.get(), 2);
                assert_ne!(service_before.id, resolved[1].singleton().unwrap().id);
                assert!(!child.ptr_eq(&scope));
                Ok(())
            },
        )
        .unwrap();

    // the parent still serves its original snapshots, nothing re-ran
    assert_eq!(scope.get("service").unwrap().id, service_before.id);
    assert_eq!(scope.get("settings").unwrap().id, settings_before.id);
    assert_eq!(counts.settings.get(), 2);
}

#[test]
fn resetting_a_mid_layer_spares_the_layers_below() {
    let scope = Scope::new();
    let counts = define_app_graph(&scope);
    let _ = scope.get("service").unwrap();

    scope
        .using(&[scope.reset("repository"), "service".into()], |_, _| {
            // settings and connection sit below the reset and survive
            assert_eq!(counts.settings.get(), 1);
            assert_eq!(counts.connection.get(), 1);
            assert_eq!(counts.repository.get(), 2);
            assert_eq!(counts.service.get(), 2);
            Ok(())
        })
        .unwrap();
}

#[test]
fn mixed_dependency_kinds_bind_in_one_call() {
    let scope = Scope::new();
    let _ = define_app_graph(&scope);

    let template = ObjectRef::new();
    template.insert("requests", Value::Int(0));

    scope
        .using(
            &[
                "service".into(),
                DependencySpec::SelfRef,
                scope.collective(Value::Object(template)),
            ],
            |bound, resolved| {
                assert_eq!(
                    resolved[0].value().and_then(Value::as_text),
                    Some("service-ready")
                );
                assert!(resolved[1].scope().unwrap().ptr_eq(bound));
                assert!(resolved[2].value().and_then(Value::as_object).is_some());
                Ok(())
            },
        )
        .unwrap();
}

#[test]
fn exported_modules_bridge_scope_trees() {
    let library = Scope::new();
    let exported = library
        .export("tokenizer", vec![], |_| {
            let tokenizer = ObjectRef::new();
            tokenizer.insert("vocab", Value::Int(50_000));
            Ok(Value::Object(tokenizer))
        })
        .unwrap();

    let mut catalog = HashMap::new();
    catalog.insert("lib/tokenizer".to_string(), exported.clone());

    let app = Scope::with_fallback(move |name| {
        catalog.get(name.as_str()).cloned().map(Into::into)
    });
    app.use_loader(|fallback, name, _| Ok(fallback.and_then(|lookup| lookup(name))));

    // the app tree adopts the definition and constructs its own copy
    let local = app.get("lib/tokenizer").unwrap();
    let library_copy = library.get("tokenizer").unwrap();
    assert_ne!(local.id, library_copy.id);
    assert_eq!(
        local.value.as_object().and_then(|t| t.get("vocab")).and_then(|v| v.as_int()),
        Some(50_000)
    );

    // adopted under its canonical name too, sharing the one singleton
    assert_eq!(app.get("tokenizer").unwrap().id, local.id);
}

#[test]
fn plain_loader_values_share_state_with_their_source() {
    let shared = ObjectRef::new();
    shared.insert("connected", Value::Bool(true));

    let scope = Scope::new();
    let source = shared.clone();
    scope.use_loader(move |_, name, _| {
        if name.as_str() == "external/session" {
            Ok(Some(graft_engine::Loaded::Plain(Value::Object(
                source.clone(),
            ))))
        } else {
            Ok(None)
        }
    });

    let session = scope.get("external/session").unwrap();
    let held = session.value.as_object().cloned().unwrap();
    assert!(held.shares_store(&shared));

    // mutations made outside the tree are visible through the cache
    shared.insert("connected", Value::Bool(false));
    assert_eq!(
        scope
            .get("external/session")
            .unwrap()
            .value
            .as_object()
            .and_then(|s| s.get("connected"))
            .and_then(|v| v.as_bool()),
        Some(false)
    );
}

#[test]
fn factories_can_fork_their_own_scope_mid_construction() {
    let scope = Scope::new();
    let _ = define_app_graph(&scope);

    scope
        .define(
            "auditor",
            vec![DependencySpec::SelfRef],
            |deps: &[Resolved]| {
                let own = deps[0]
                    .scope()
                    .ok_or_else(|| GraftError::Factory("missing scope".into()))?;
                // audit against a private fork so the outer graph is untouched
                let fresh = own.using(
                    &[own.reset("settings"), "settings".into()],
                    |_, resolved| {
                        Ok(resolved[1]
                            .value()
                            .and_then(Value::as_object)
                            .map(|s| s.len())
                            .unwrap_or(0))
                    },
                )?;
                Ok(Value::text(format!("audited:{fresh}")))
            },
        )
        .unwrap();

    let before = scope.get("settings").unwrap();
    assert_eq!(
        scope.get("auditor").unwrap().value.as_text(),
        Some("audited:1")
    );
    assert_eq!(scope.get("settings").unwrap().id, before.id);
}

#![deny(unsafe_code)]
//! Graft demo binary walking module composition end to end.
//!
//! Runs a self-contained tour of:
//! 1. Lazy, memoized construction over a layered module graph
//! 2. Collective templates that accumulate state across rebuilds
//! 3. Reset cascades forking child scopes, parents untouched
//! 4. Collectivized classes and the guard that protects them
//! 5. Loader-backed identifiers and scope tree dumps
//!
//! No external services required; every module is built in-process.

use anyhow::Result;
use clap::Parser;
use graft_engine::{Loaded, Scope};
use graft_types::{DependencySpec, GraftError, ObjectRef, Value};
use std::cell::Cell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graft-demo", about = "Guided tour of graft scopes and resets")]
#[command(version)]
struct Cli {
    /// Print the final scope tree as pretty JSON
    #[arg(long)]
    dump: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── Formatting helpers ──────────────────────────────────────────────

fn section(title: &str) {
    println!();
    println!(" ── {title} {}", "─".repeat(56usize.saturating_sub(title.len())));
}

fn ok(msg: &str) {
    println!("   [OK]  {msg}");
}

fn info(msg: &str) {
    println!("   [--]  {msg}");
}

// ── Main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level.to_string())),
        )
        .init();

    if let Err(e) = run_demo(&cli) {
        eprintln!();
        eprintln!("   [FATAL]  Demo failed: {e}");
        std::process::exit(1);
    }

    println!();
    println!("  Demo complete.");
}

fn run_demo(cli: &Cli) -> Result<()> {
    let scope = Scope::new();

    // ── 1. A layered graph, constructed lazily ──────────────────────
    section("Lazy construction");

    let builds = Rc::new(Cell::new(0u32));
    let tally = Rc::clone(&builds);
    scope.define("settings", vec![], move |_| {
        tally.set(tally.get() + 1);
        let settings = ObjectRef::new();
        settings.insert("region", Value::text("eu-north"));
        Ok(Value::Object(settings))
    })?;
    scope.define(
        "journal",
        vec![DependencySpec::name("settings")],
        |_| {
            let journal = ObjectRef::new();
            journal.insert("entries", Value::List(graft_types::ListRef::new()));
            Ok(Value::Object(journal))
        },
    )?;
    scope.define(
        "reporter",
        vec![DependencySpec::name("journal"), DependencySpec::name("settings")],
        |deps| {
            let region = deps[1]
                .value()
                .and_then(Value::as_object)
                .and_then(|settings| settings.get("region"))
                .and_then(|region| region.as_text().map(str::to_string))
                .ok_or_else(|| GraftError::Factory("settings lost their region".into()))?;
            Ok(Value::text(format!("reporting from {region}")))
        },
    )?;
    info("defined settings, journal, reporter; nothing constructed yet");
    assert_eq!(builds.get(), 0);

    let reporter = scope.get("reporter")?;
    ok(&format!(
        "reporter resolved: \"{}\" (settings built {} time)",
        reporter.value.as_text().unwrap_or("?"),
        builds.get()
    ));

    let again = scope.get("reporter")?;
    ok(&format!(
        "second lookup reused singleton {} (same id: {})",
        again.id.short(),
        again.id == reporter.id
    ));

    // ── 2. Collectives accumulate across rebuilds ───────────────────
    section("Collective accumulation");

    let metrics = ObjectRef::new();
    metrics.insert("rebuilds", Value::Int(0));
    scope.define(
        "watcher",
        vec![
            DependencySpec::name("settings"),
            DependencySpec::collective(Value::Object(metrics)),
        ],
        |deps| {
            let shared = deps[1]
                .value()
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| GraftError::Factory("missing metrics".into()))?;
            let seen = shared.get("rebuilds").and_then(|v| v.as_int()).unwrap_or(0) + 1;
            shared.insert("rebuilds", Value::Int(seen));
            let product = ObjectRef::new();
            product.insert("rebuilds", Value::Int(seen));
            Ok(Value::Object(product))
        },
    )?;

    let watcher = scope.get("watcher")?;
    ok(&format!(
        "watcher built; its collective clone has seen {} build",
        watcher
            .value
            .as_object()
            .and_then(|w| w.get("rebuilds"))
            .and_then(|v| v.as_int())
            .unwrap_or(0)
    ));

    // ── 3. Reset cascades fork a child scope ────────────────────────
    section("Reset cascade");

    scope.using(
        &[scope.reset("settings"), "reporter".into(), "watcher".into()],
        |child, resolved| {
            ok(&format!(
                "forked child {}; settings rebuilt ({} total builds)",
                child.id().short(),
                builds.get()
            ));
            let fresh = resolved[1].singleton().map(|s| s.id.clone());
            ok(&format!(
                "reporter reconstructed: new singleton {}",
                fresh.map(|id| id.short().to_string()).unwrap_or_default()
            ));
            let rebuilds = resolved[2]
                .value()
                .and_then(Value::as_object)
                .and_then(|w| w.get("rebuilds"))
                .and_then(|v| v.as_int())
                .unwrap_or(0);
            ok(&format!(
                "watcher rebuilt, but its collective clone remembers: {rebuilds} builds"
            ));
            Ok(())
        },
    )?;
    ok(&format!(
        "parent still serves the original reporter (id {})",
        scope.get("reporter")?.id.short()
    ));

    // ── 4. Collectivize and its reset guard ─────────────────────────
    section("Collectivize");

    let mailer_class = ObjectRef::new();
    mailer_class.insert(
        "new",
        Value::function(|_| {
            let sent = Rc::new(Cell::new(0i64));
            let instance = ObjectRef::new();
            let counter = Rc::clone(&sent);
            instance.insert(
                "send",
                Value::function(move |_| {
                    counter.set(counter.get() + 1);
                    Ok(Value::Int(counter.get()))
                }),
            );
            instance.insert("sent", Value::function(move |_| Ok(Value::Int(sent.get()))));
            Ok(Value::Object(instance))
        }),
    );
    let mailer_class = Value::Object(mailer_class);

    scope.define(
        "mailer",
        vec![
            DependencySpec::SelfRef,
            DependencySpec::name("settings"),
            DependencySpec::collective(Value::Object(ObjectRef::new())),
        ],
        move |deps| {
            let own = deps[0]
                .scope()
                .ok_or_else(|| GraftError::Factory("missing scope".into()))?;
            let clone = deps[2]
                .value()
                .cloned()
                .ok_or_else(|| GraftError::Factory("missing collective".into()))?;
            own.collectivize(&mailer_class, &clone, None, &["send", "sent"])
        },
    )?;

    let mailer = scope.get("mailer")?;
    let send = mailer
        .value
        .as_object()
        .and_then(|m| m.get("send"))
        .ok_or_else(|| anyhow::anyhow!("mailer lost its send method"))?;
    send.call(&[])?;
    send.call(&[])?;
    ok("mailer.send called twice through one shared instance");

    match scope.using(&[scope.reset("settings")], |_, _| Ok(())) {
        Err(GraftError::CollectivizedReset { module, reset }) => {
            ok(&format!(
                "guard refused the cascade: '{module}' cannot be swept up by resetting '{reset}'"
            ));
        }
        Err(other) => return Err(other.into()),
        Ok(()) => info("cascade went through (guard not triggered)"),
    }

    scope.using(&[scope.reset("mailer"), "mailer".into()], |_, resolved| {
        ok(&format!(
            "direct reset of the mailer is allowed (fresh singleton {})",
            resolved[1]
                .singleton()
                .map(|s| s.id.short().to_string())
                .unwrap_or_default()
        ));
        Ok(())
    })?;

    // ── 5. Loaders resolve unknown identifiers ──────────────────────
    section("Loaders");

    scope.use_loader(|_, name, _| {
        let Some(asset) = name.as_str().strip_prefix("assets/") else {
            return Ok(None);
        };
        Ok(Some(Loaded::Plain(Value::text(format!("<{asset}.svg>")))))
    });
    let logo = scope.get("assets/logo")?;
    ok(&format!(
        "loader served assets/logo: {}",
        logo.value.as_text().unwrap_or("?")
    ));

    // ── 6. Scope tree dump ──────────────────────────────────────────
    if cli.dump {
        section("Scope dump");
        println!("{}", serde_json::to_string_pretty(&scope.dump())?);
    }

    Ok(())
}

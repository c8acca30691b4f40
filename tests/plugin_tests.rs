//! Plugin interface tests against the sample plugin.
//!
//! Plugin lifecycle hooks touch process-global state (the cleanup log env
//! var, the image's own statics), so these tests serialize on a mutex.

mod util;

use std::sync::{Mutex, MutexGuard, PoisonError};

use vetra_bridge::{BridgeError, LibraryKind, LibraryRegistry, Value};

static PLUGIN_LOCK: Mutex<()> = Mutex::new(());

fn serialize() -> MutexGuard<'static, ()> {
    PLUGIN_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn load_plugin(alias: &str) -> LibraryRegistry {
    let path = util::demo_artifact("vetra_demo_plugin");
    let mut registry = LibraryRegistry::new();
    assert!(registry.load(alias, path.to_str().unwrap(), "plugin"));
    registry
}

#[test]
fn init_hook_runs_at_load() {
    let _guard = serialize();
    let mut registry = load_plugin("p");
    assert_eq!(registry.kind_of("p"), Some(LibraryKind::Plugin));
    let ready = registry.call("p", "ready", &[]).unwrap();
    assert_eq!(ready, Value::Bool(true));
}

#[test]
fn info_hook_text_is_recorded() {
    let _guard = serialize();
    let registry = load_plugin("p");
    let info = registry.info("p").expect("plugin reports info");
    assert!(info.contains("Vetra demo plugin"));
}

#[test]
fn prefixed_exports_dispatch_with_shared_values() {
    let _guard = serialize();
    let mut registry = load_plugin("p");

    let total = registry
        .call(
            "p",
            "sum",
            &[Value::Number(1.0), Value::Number(2.0), Value::Number(3.5)],
        )
        .unwrap();
    assert_eq!(total, Value::Number(6.5));

    let joined = registry
        .call(
            "p",
            "join",
            &[Value::Text("hello".into()), Value::Text("vetra".into())],
        )
        .unwrap();
    assert_eq!(joined, Value::Text("hello vetra".into()));

    // Lists cross the boundary unconverted.
    let list = Value::list(vec![Value::Number(1.0), Value::Text("x".into())]);
    let echoed = registry.call("p", "echo", &[list.clone()]).unwrap();
    assert_eq!(echoed, list);

    let count = registry
        .call("p", "count", &[Value::Nil, Value::Nil])
        .unwrap();
    assert_eq!(count, Value::Number(2.0));
}

#[test]
fn missing_export_fails_symbol_not_found() {
    let _guard = serialize();
    let mut registry = load_plugin("p");
    let err = registry.call("p", "not_exported", &[]).unwrap_err();
    assert!(matches!(err, BridgeError::SymbolNotFound(name) if name == "not_exported"));
}

#[test]
fn has_function_checks_the_prefixed_symbol() {
    let _guard = serialize();
    let registry = load_plugin("p");
    assert!(registry.has_function("p", "sum"));
    assert!(!registry.has_function("p", "not_exported"));
}

#[test]
fn cleanup_runs_exactly_once_on_unload() {
    let _guard = serialize();
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("cleanup.log");
    // The env var is read by the demo plugin's cleanup hook.
    std::env::set_var("VETRA_PLUGIN_CLEANUP_LOG", &log);

    let mut registry = load_plugin("p");
    // A failed call must not skip the cleanup hook later.
    let _ = registry.call("p", "not_exported", &[]);

    registry.unload("p");
    registry.unload("p");
    std::env::remove_var("VETRA_PLUGIN_CLEANUP_LOG");

    let contents = std::fs::read_to_string(&log).unwrap();
    assert_eq!(contents.lines().filter(|l| *l == "cleanup").count(), 1);
}

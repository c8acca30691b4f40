//! Embedded-script interface tests. Compiled only with the `python` feature;
//! they require a CPython shared library at run time.

#![cfg(feature = "python")]

mod util;

use vetra_bridge::{BridgeError, LibraryKind, LibraryRegistry, Value};

fn load_fixture(alias: &str) -> LibraryRegistry {
    let path = util::fixture("bridge_demo.py");
    let mut registry = LibraryRegistry::new();
    assert!(registry.load(alias, path.to_str().unwrap(), "embedded-script"));
    registry
}

#[test]
fn module_loads_from_its_file_stem() {
    let registry = load_fixture("py");
    assert_eq!(registry.kind_of("py"), Some(LibraryKind::EmbeddedScript));
    assert!(registry.has_function("py", "fibonacci"));
}

#[test]
fn numbers_round_trip_as_floats() {
    let mut registry = load_fixture("py");
    let result = registry
        .call("py", "fibonacci", &[Value::Number(10.0)])
        .unwrap();
    assert_eq!(result, Value::Number(55.0));
}

#[test]
fn text_and_bool_round_trip() {
    let mut registry = load_fixture("py");
    let greeting = registry
        .call("py", "greet", &[Value::Text("vetra".into())])
        .unwrap();
    assert_eq!(greeting, Value::Text("Hello, vetra".into()));

    let even = registry
        .call("py", "is_even", &[Value::Number(4.0)])
        .unwrap();
    assert_eq!(even, Value::Bool(true));
}

#[test]
fn lists_marshal_recursively_in_both_directions() {
    let mut registry = load_fixture("py");
    let values = Value::list(vec![Value::Number(1.0), Value::Number(2.5)]);
    let scaled = registry
        .call("py", "scale", &[values, Value::Number(2.0)])
        .unwrap();
    assert_eq!(
        scaled,
        Value::list(vec![Value::Number(2.0), Value::Number(5.0)])
    );
}

#[test]
fn none_becomes_nil_and_unsupported_list_elements_become_nil() {
    let mut registry = load_fixture("py");
    assert_eq!(registry.call("py", "nothing", &[]).unwrap(), Value::Nil);

    let mixed = registry.call("py", "mixed", &[]).unwrap();
    assert_eq!(
        mixed,
        Value::list(vec![
            Value::Number(1.0),
            Value::Text("two".into()),
            Value::Bool(true),
            Value::Nil,
            Value::Nil, // dicts are not a bridge type
        ])
    );
}

#[test]
fn unknown_result_types_coerce_to_text_at_top_level() {
    let mut registry = load_fixture("py");
    let point = registry.call("py", "make_point", &[]).unwrap();
    assert_eq!(point, Value::Text("(1, 2)".into()));
}

#[test]
fn raised_exceptions_become_invocation_errors() {
    let mut registry = load_fixture("py");
    let err = registry.call("py", "explode", &[]).unwrap_err();
    match err {
        BridgeError::Invocation { function, reason } => {
            assert_eq!(function, "explode");
            assert!(reason.contains("boom"), "reason was: {reason}");
        }
        other => panic!("expected invocation error, got {other}"),
    }

    // The interpreter must be usable again afterwards: no pending error.
    let result = registry
        .call("py", "fibonacci", &[Value::Number(5.0)])
        .unwrap();
    assert_eq!(result, Value::Number(5.0));
}

#[test]
fn missing_or_non_callable_attributes_fail_symbol_not_found() {
    let mut registry = load_fixture("py");
    let err = registry.call("py", "absent", &[]).unwrap_err();
    assert!(matches!(err, BridgeError::SymbolNotFound(name) if name == "absent"));

    // VERSION exists but is not callable.
    let err = registry.call("py", "VERSION", &[]).unwrap_err();
    assert!(matches!(err, BridgeError::SymbolNotFound(_)));
    assert!(!registry.has_function("py", "VERSION"));
}

#[test]
fn import_failure_reports_false_from_the_registry() {
    let mut registry = LibraryRegistry::new();
    assert!(!registry.load("bad", "tests/fixtures/no_such_module.py", "embedded-script"));
    assert!(!registry.has("bad"));
}

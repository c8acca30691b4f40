//! Sample plugin for the Vetra bridge.
//!
//! Demonstrates the fixed plugin convention: every export is named
//! `vetra_<function>` and shares the signature `fn(&[Value]) -> Value`,
//! compiled against the bridge's shared value type. Lifecycle hooks are
//! optional; this plugin implements all three. The cleanup hook appends a
//! line to the file named by `VETRA_PLUGIN_CLEANUP_LOG` so hosts (and the
//! bridge's own tests) can observe that it ran exactly once.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use vetra_bridge::Value;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

#[no_mangle]
pub fn vetra_plugin_init() {
    INITIALIZED.store(true, Ordering::SeqCst);
}

#[no_mangle]
pub fn vetra_plugin_cleanup() {
    INITIALIZED.store(false, Ordering::SeqCst);
    if let Ok(path) = std::env::var("VETRA_PLUGIN_CLEANUP_LOG") {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "cleanup");
        }
    }
}

#[no_mangle]
pub fn vetra_plugin_info() -> &'static str {
    "Vetra demo plugin v0.1 - arithmetic and text helpers"
}

/// Reports whether the init hook ran.
#[no_mangle]
pub fn vetra_ready(_args: &[Value]) -> Value {
    Value::Bool(INITIALIZED.load(Ordering::SeqCst))
}

/// Sum of all numeric arguments; non-numbers count as zero.
#[no_mangle]
pub fn vetra_sum(args: &[Value]) -> Value {
    let total: f64 = args
        .iter()
        .map(|arg| arg.as_number().unwrap_or(0.0))
        .sum();
    Value::Number(total)
}

/// Joins the text arguments with single spaces.
#[no_mangle]
pub fn vetra_join(args: &[Value]) -> Value {
    let words: Vec<&str> = args.iter().filter_map(Value::as_text).collect();
    Value::Text(words.join(" "))
}

/// Returns its first argument unchanged, or nil when called without one.
#[no_mangle]
pub fn vetra_echo(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Nil)
}

/// Number of arguments supplied.
#[no_mangle]
pub fn vetra_count(args: &[Value]) -> Value {
    Value::Number(args.len() as f64)
}

//! Embedded-script interface (CPython).
//!
//! The interpreter is a process-wide singleton: [`EmbeddedRuntime::global`]
//! bootstraps it exactly once and extends `sys.path` with the working
//! directory and the conventional `vetra_modules` directory. Each module
//! load additionally registers its file's parent directory so modules bound
//! by path resolve without configuration.
//!
//! pyo3 owns the reference counts and the interpreter error state, so every
//! foreign object reference obtained while marshalling is released on every
//! exit path, and a raised Python exception is consumed into a
//! [`BridgeError::Invocation`] rather than left pending.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyFloat, PyList, PyLong, PyModule, PyString, PyTuple};
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::registry::{LibraryInterface, LibraryKind};
use crate::value::Value;

/// Directory appended to the module search path alongside the working
/// directory.
pub const MODULE_DIR: &str = "vetra_modules";

static RUNTIME: OnceCell<EmbeddedRuntime> = OnceCell::new();

/// Process-wide embedded interpreter context.
pub struct EmbeddedRuntime {
    search_paths: Mutex<HashSet<PathBuf>>,
}

impl EmbeddedRuntime {
    /// Returns the singleton, initializing the interpreter on first use.
    pub fn global() -> &'static EmbeddedRuntime {
        RUNTIME.get_or_init(|| {
            let runtime = EmbeddedRuntime {
                search_paths: Mutex::new(HashSet::new()),
            };
            Python::with_gil(|py| {
                if let Err(err) = bootstrap_search_path(py) {
                    // Imports may still succeed for installed modules.
                    debug!(error = %err, "could not extend interpreter search path");
                }
            });
            info!("embedded script interpreter initialized");
            runtime
        })
    }

    /// Ensures `dir` is on `sys.path`, appending it at most once.
    fn ensure_search_path(&self, dir: &Path) {
        let mut paths = self.search_paths.lock();
        if !paths.insert(dir.to_path_buf()) {
            return;
        }
        Python::with_gil(|py| {
            if let Err(err) = append_sys_path(py, &dir.to_string_lossy()) {
                debug!(dir = %dir.display(), error = %err, "could not append search path");
            }
        });
    }
}

fn bootstrap_search_path(py: Python<'_>) -> PyResult<()> {
    append_sys_path(py, ".")?;
    append_sys_path(py, &format!("./{MODULE_DIR}"))
}

fn append_sys_path(py: Python<'_>, dir: &str) -> PyResult<()> {
    let sys = py.import("sys")?;
    sys.getattr("path")?.call_method1("append", (dir,))?;
    Ok(())
}

/// One imported module bound under an alias.
pub struct ScriptModule {
    runtime: &'static EmbeddedRuntime,
    module: Py<PyModule>,
    name: String,
}

impl ScriptModule {
    /// Imports the module named by `path`'s file stem.
    pub fn load(path: &str) -> Result<Self, BridgeError> {
        let runtime = EmbeddedRuntime::global();
        let file = Path::new(path);
        let name = file
            .file_stem()
            .and_then(OsStr::to_str)
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| BridgeError::load(path, "path has no module name"))?
            .to_string();
        match file.parent() {
            Some(parent) if parent != Path::new("") => runtime.ensure_search_path(parent),
            _ => {}
        }
        let module = Python::with_gil(|py| {
            PyModule::import(py, name.as_str())
                .map(Into::into)
                .map_err(|err| BridgeError::load(path, render_pyerr(py, &err)))
        })?;
        debug!(module = %name, "imported script module");
        Ok(Self {
            runtime,
            module,
            name,
        })
    }

    pub fn module_name(&self) -> &str {
        &self.name
    }

    /// The interpreter context this binding runs in.
    pub fn runtime(&self) -> &'static EmbeddedRuntime {
        self.runtime
    }
}

impl LibraryInterface for ScriptModule {
    fn kind(&self) -> LibraryKind {
        LibraryKind::EmbeddedScript
    }

    fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, BridgeError> {
        Python::with_gil(|py| {
            let module = self.module.as_ref(py);
            let target = module
                .getattr(function)
                .map_err(|_| BridgeError::SymbolNotFound(function.to_string()))?;
            if !target.is_callable() {
                return Err(BridgeError::SymbolNotFound(function.to_string()));
            }
            let positional =
                PyTuple::new(py, args.iter().map(|arg| to_python(py, arg)));
            let result = target
                .call1(positional)
                .map_err(|err| BridgeError::invocation(function, render_pyerr(py, &err)))?;
            Ok(from_python(result, true))
        })
    }

    fn has_function(&self, function: &str) -> bool {
        Python::with_gil(|py| {
            self.module
                .as_ref(py)
                .getattr(function)
                .map(|attr| attr.is_callable())
                .unwrap_or(false)
        })
    }
}

/// Marshals a host value into the interpreter. Callables (and nil) cross as
/// `None`; lists convert recursively.
fn to_python(py: Python<'_>, value: &Value) -> PyObject {
    match value {
        Value::Nil | Value::Callable(_) => py.None(),
        Value::Bool(b) => b.into_py(py),
        Value::Number(n) => n.into_py(py),
        Value::Text(s) => s.as_str().into_py(py),
        Value::List(items) => {
            PyList::new(py, items.iter().map(|item| to_python(py, item))).into_py(py)
        }
    }
}

/// Marshals an interpreter value back to the host.
///
/// Booleans are checked before integers because `bool` subclasses `int` in
/// Python. At the top level an unknown type degrades to its `str()` text;
/// inside a list it degrades to nil.
fn from_python(any: &PyAny, top_level: bool) -> Value {
    if any.is_none() {
        return Value::Nil;
    }
    if let Ok(b) = any.downcast::<PyBool>() {
        return Value::Bool(b.is_true());
    }
    if let Ok(f) = any.downcast::<PyFloat>() {
        return Value::Number(f.value());
    }
    if let Ok(i) = any.downcast::<PyLong>() {
        return i
            .extract::<f64>()
            .map(Value::Number)
            .unwrap_or(Value::Nil);
    }
    if let Ok(s) = any.downcast::<PyString>() {
        return Value::Text(s.to_string_lossy().into_owned());
    }
    if let Ok(list) = any.downcast::<PyList>() {
        let items = list.iter().map(|item| from_python(item, false)).collect();
        return Value::list(items);
    }
    if top_level {
        match any.str() {
            Ok(text) => Value::Text(text.to_string_lossy().into_owned()),
            Err(_) => Value::Nil,
        }
    } else {
        Value::Nil
    }
}

/// Renders an interpreter error with its traceback text when available.
fn render_pyerr(py: Python<'_>, err: &PyErr) -> String {
    let message = err.to_string();
    match err.traceback(py).and_then(|tb| tb.format().ok()) {
        Some(traceback) => format!("{traceback}{message}"),
        None => message,
    }
}

//! Native-code interface.
//!
//! Plain C exports carry no signature metadata, so the bridge discovers a
//! call shape from the runtime argument list and transmutes the resolved
//! symbol to the matching function type. The supported matrix is closed:
//! zero arguments, one number, one text, or two to four numbers. Anything
//! else is rejected before any foreign code runs; guessing a wider shape
//! would read garbage off the call stack.

use std::collections::HashMap;
use std::ffi::{c_char, CStr, CString};
use std::mem;

use libloading::Library;
use tracing::debug;

use crate::error::BridgeError;
use crate::registry::{LibraryInterface, LibraryKind};
use crate::value::Value;

/// Call shape discovered from a runtime argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// `fn() -> f64`
    Nullary,
    /// `fn(f64) -> f64`
    UnaryNumber,
    /// `fn(*const c_char) -> *const c_char`
    UnaryText,
    /// `fn(f64, ...) -> f64` with 2..=4 parameters.
    Numeric(u8),
}

impl CallShape {
    /// Selects the shape for an argument list, or `None` when the list falls
    /// outside the supported matrix.
    pub fn for_args(args: &[Value]) -> Option<CallShape> {
        match args {
            [] => Some(CallShape::Nullary),
            [Value::Number(_)] => Some(CallShape::UnaryNumber),
            [Value::Text(_)] => Some(CallShape::UnaryText),
            rest if (2..=4).contains(&rest.len()) && rest.iter().all(Value::is_number) => {
                Some(CallShape::Numeric(rest.len() as u8))
            }
            _ => None,
        }
    }

    fn describe(args: &[Value]) -> String {
        let tags: Vec<&str> = args.iter().map(Value::type_name).collect();
        format!("({})", tags.join(", "))
    }
}

/// Cached resolution for one exported function.
struct ResolvedSymbol {
    addr: *const (),
    shape: Option<CallShape>,
}

/// A shared-library image bound with `extern "<path>" as <alias> : native-code`.
pub struct NativeLibrary {
    library: Library,
    // Addresses never outlive `library`; both drop together.
    symbols: HashMap<String, ResolvedSymbol>,
}

impl NativeLibrary {
    /// Loads the shared-library image at `path` via the platform loader.
    pub fn open(path: &str) -> Result<Self, BridgeError> {
        // SAFETY: loading runs the image's initializers; the producer
        // contract in the bridge documentation makes that the library
        // author's responsibility.
        let library = unsafe { Library::new(path) }
            .map_err(|err| BridgeError::load(path, err.to_string()))?;
        debug!(path, "opened native library");
        Ok(Self {
            library,
            symbols: HashMap::new(),
        })
    }

    /// Resolves `function` through the cache, inserting on first lookup.
    fn resolve(&mut self, function: &str) -> Result<*const (), BridgeError> {
        if let Some(entry) = self.symbols.get(function) {
            return Ok(entry.addr);
        }
        // SAFETY: the symbol is only stored here; it is transmuted to a
        // concrete function type at the call site once a shape is chosen.
        let addr = unsafe { self.library.get::<*const ()>(function.as_bytes()) }
            .map(|symbol| *symbol)
            .map_err(|_| BridgeError::SymbolNotFound(function.to_string()))?;
        self.symbols.insert(
            function.to_string(),
            ResolvedSymbol { addr, shape: None },
        );
        Ok(addr)
    }

    /// Invokes `addr` as `shape`.
    ///
    /// # Safety
    /// `addr` must be a live export of `self.library`. The shape is an
    /// assumption about the real signature; a producer that exports a
    /// different arity under the same shape invokes undefined behavior,
    /// which is the documented risk of signature-less native exports.
    unsafe fn invoke(
        &self,
        addr: *const (),
        shape: CallShape,
        args: &[Value],
    ) -> Result<Value, BridgeError> {
        let number = |value: &Value| value.as_number().unwrap_or(0.0);
        match shape {
            CallShape::Nullary => {
                let f: unsafe extern "C" fn() -> f64 = mem::transmute(addr);
                Ok(Value::Number(f()))
            }
            CallShape::UnaryNumber => {
                let f: unsafe extern "C" fn(f64) -> f64 = mem::transmute(addr);
                Ok(Value::Number(f(number(&args[0]))))
            }
            CallShape::UnaryText => {
                let text = args[0].as_text().unwrap_or_default();
                let input = CString::new(text).map_err(|_| {
                    BridgeError::Marshalling("text argument contains an interior NUL".into())
                })?;
                let f: unsafe extern "C" fn(*const c_char) -> *const c_char =
                    mem::transmute(addr);
                let out = f(input.as_ptr());
                if out.is_null() {
                    Ok(Value::Text(String::new()))
                } else {
                    Ok(Value::Text(CStr::from_ptr(out).to_string_lossy().into_owned()))
                }
            }
            CallShape::Numeric(2) => {
                let f: unsafe extern "C" fn(f64, f64) -> f64 = mem::transmute(addr);
                Ok(Value::Number(f(number(&args[0]), number(&args[1]))))
            }
            CallShape::Numeric(3) => {
                let f: unsafe extern "C" fn(f64, f64, f64) -> f64 = mem::transmute(addr);
                Ok(Value::Number(f(
                    number(&args[0]),
                    number(&args[1]),
                    number(&args[2]),
                )))
            }
            CallShape::Numeric(_) => {
                let f: unsafe extern "C" fn(f64, f64, f64, f64) -> f64 = mem::transmute(addr);
                Ok(Value::Number(f(
                    number(&args[0]),
                    number(&args[1]),
                    number(&args[2]),
                    number(&args[3]),
                )))
            }
        }
    }
}

impl LibraryInterface for NativeLibrary {
    fn kind(&self) -> LibraryKind {
        LibraryKind::NativeCode
    }

    fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, BridgeError> {
        let shape = CallShape::for_args(args).ok_or_else(|| {
            BridgeError::Marshalling(format!(
                "no native call shape matches arguments {}",
                CallShape::describe(args)
            ))
        })?;
        let addr = self.resolve(function)?;
        if let Some(entry) = self.symbols.get_mut(function) {
            if entry.shape != Some(shape) {
                entry.shape = Some(shape);
            }
        }
        // SAFETY: `addr` was resolved from `self.library`, which we own and
        // keep alive for as long as this cache entry exists.
        unsafe { self.invoke(addr, shape, args) }
    }

    fn has_function(&self, function: &str) -> bool {
        if self.symbols.contains_key(function) {
            return true;
        }
        // SAFETY: lookup only; the symbol is never invoked here.
        unsafe {
            self.library
                .get::<*const ()>(function.as_bytes())
                .is_ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_selection_follows_fixed_precedence() {
        assert_eq!(CallShape::for_args(&[]), Some(CallShape::Nullary));
        assert_eq!(
            CallShape::for_args(&[Value::Number(1.0)]),
            Some(CallShape::UnaryNumber)
        );
        assert_eq!(
            CallShape::for_args(&[Value::Text("x".into())]),
            Some(CallShape::UnaryText)
        );
        for n in 2..=4 {
            let args = vec![Value::Number(0.0); n];
            assert_eq!(CallShape::for_args(&args), Some(CallShape::Numeric(n as u8)));
        }
    }

    #[test]
    fn unsupported_shapes_are_rejected() {
        assert_eq!(CallShape::for_args(&vec![Value::Number(0.0); 5]), None);
        assert_eq!(CallShape::for_args(&[Value::Bool(true)]), None);
        assert_eq!(
            CallShape::for_args(&[Value::Text("a".into()), Value::Text("b".into())]),
            None
        );
        assert_eq!(
            CallShape::for_args(&[Value::Number(1.0), Value::Text("b".into())]),
            None
        );
    }

    #[test]
    fn shape_mismatch_reports_argument_types() {
        let args = [Value::Bool(true), Value::Nil];
        assert_eq!(CallShape::describe(&args), "(bool, nil)");
    }
}

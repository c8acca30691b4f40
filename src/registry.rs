//! Alias-to-library registry.
//!
//! The registry is the façade the Vetra evaluator talks to: `extern`/`plugin`
//! bind statements become [`LibraryRegistry::load`], `call_native` expressions
//! become [`LibraryRegistry::call`]. Construction failures are swallowed into
//! `false` plus a logged diagnostic so a failed bind never aborts a script;
//! call failures surface as [`BridgeError`] values the evaluator converts to
//! its own runtime errors.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::error::BridgeError;
use crate::native::NativeLibrary;
use crate::plugin::PluginLibrary;
use crate::value::Value;

/// The four foreign execution models the bridge can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    NativeCode,
    EmbeddedScript,
    ManagedRuntime,
    Plugin,
}

impl LibraryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LibraryKind::NativeCode => "native-code",
            LibraryKind::EmbeddedScript => "embedded-script",
            LibraryKind::ManagedRuntime => "managed-runtime",
            LibraryKind::Plugin => "plugin",
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LibraryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native-code" => Ok(LibraryKind::NativeCode),
            "embedded-script" => Ok(LibraryKind::EmbeddedScript),
            "managed-runtime" => Ok(LibraryKind::ManagedRuntime),
            "plugin" => Ok(LibraryKind::Plugin),
            _ => Err(()),
        }
    }
}

/// A bound foreign library: resolve-and-call, existence probes, and the
/// diagnostics the registry reports about the binding.
///
/// `call` takes `&mut self` because interfaces memoize resolved symbols and
/// call shapes on first use; `has_function` must stay side-effect free.
pub trait LibraryInterface {
    fn kind(&self) -> LibraryKind;

    fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, BridgeError>;

    fn has_function(&self, function: &str) -> bool;

    /// Optional descriptive text (plugins report their `info` hook here).
    fn describe(&self) -> Option<&str> {
        None
    }
}

/// Maps user-chosen aliases to loaded library interfaces.
///
/// Dispatch is synchronous; the alias map and per-library symbol caches
/// assume a single writer, matching the host evaluator.
#[derive(Default)]
pub struct LibraryRegistry {
    libraries: HashMap<String, Box<dyn LibraryInterface>>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `alias` to the library at `path`, interpreted per `kind`.
    ///
    /// Returns `false` (never an error) when the kind is unknown, the alias
    /// is already bound, or construction fails; the cause is logged. An
    /// already-bound alias must be unloaded explicitly first, since rebinding
    /// in place would leak the previous binding's native resources.
    pub fn load(&mut self, alias: &str, path: &str, kind: &str) -> bool {
        let Ok(kind) = kind.parse::<LibraryKind>() else {
            warn!(alias, kind, "unknown library kind");
            return false;
        };
        if self.libraries.contains_key(alias) {
            warn!(alias, "alias already bound; unload it before rebinding");
            return false;
        }
        match Self::construct(path, kind) {
            Ok(interface) => {
                self.libraries.insert(alias.to_string(), interface);
                true
            }
            Err(err) => {
                warn!(alias, path, %kind, error = %err, "failed to load library");
                false
            }
        }
    }

    fn construct(path: &str, kind: LibraryKind) -> Result<Box<dyn LibraryInterface>, BridgeError> {
        match kind {
            LibraryKind::NativeCode => Ok(Box::new(NativeLibrary::open(path)?)),
            LibraryKind::Plugin => Ok(Box::new(PluginLibrary::open(path)?)),
            #[cfg(feature = "python")]
            LibraryKind::EmbeddedScript => Ok(Box::new(crate::script::ScriptModule::load(path)?)),
            #[cfg(not(feature = "python"))]
            LibraryKind::EmbeddedScript => Err(BridgeError::Unsupported("embedded-script")),
            #[cfg(feature = "jvm")]
            LibraryKind::ManagedRuntime => Ok(Box::new(crate::managed::ManagedClass::load(path)?)),
            #[cfg(not(feature = "jvm"))]
            LibraryKind::ManagedRuntime => Err(BridgeError::Unsupported("managed-runtime")),
        }
    }

    /// Invokes `function` on the library bound to `alias`.
    pub fn call(
        &mut self,
        alias: &str,
        function: &str,
        args: &[Value],
    ) -> Result<Value, BridgeError> {
        let interface = self
            .libraries
            .get_mut(alias)
            .ok_or_else(|| BridgeError::NotLoaded(alias.to_string()))?;
        interface.call(function, args)
    }

    pub fn has(&self, alias: &str) -> bool {
        self.libraries.contains_key(alias)
    }

    /// Existence probe; never invokes the function.
    pub fn has_function(&self, alias: &str, function: &str) -> bool {
        self.libraries
            .get(alias)
            .is_some_and(|interface| interface.has_function(function))
    }

    /// Releases the binding's native resources. A no-op for unknown aliases.
    pub fn unload(&mut self, alias: &str) {
        // Dropping the interface invalidates its symbol caches and runs
        // plugin cleanup before the OS handle closes.
        self.libraries.remove(alias);
    }

    pub fn unload_all(&mut self) {
        self.libraries.clear();
    }

    /// Aliases of all live bindings, sorted for stable output.
    pub fn loaded(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.libraries.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub fn kind_of(&self, alias: &str) -> Option<LibraryKind> {
        self.libraries.get(alias).map(|interface| interface.kind())
    }

    /// Diagnostic text reported by the binding, if any.
    pub fn info(&self, alias: &str) -> Option<&str> {
        self.libraries
            .get(alias)
            .and_then(|interface| interface.describe())
    }
}

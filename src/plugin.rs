//! Vetra plugin interface.
//!
//! Plugins are shared libraries compiled against this crate's [`Value`] type,
//! so every export shares exactly one signature and no call-shape discovery
//! is needed. Exports are named `vetra_<function>`; the optional lifecycle
//! hooks are `vetra_plugin_init`, `vetra_plugin_cleanup` and
//! `vetra_plugin_info`. `cleanup` runs exactly once, from `Drop`, before the
//! OS handle closes, regardless of whether earlier calls failed.

use std::collections::HashMap;

use libloading::Library;
use tracing::{debug, info};

use crate::error::BridgeError;
use crate::registry::{LibraryInterface, LibraryKind};
use crate::value::Value;

/// Prefix every plugin export carries.
pub const PLUGIN_PREFIX: &str = "vetra_";

/// Signature of every plugin-exported function.
pub type PluginFn = fn(&[Value]) -> Value;

/// Signature of the optional `init`/`cleanup` hooks.
pub type PluginHookFn = fn();

/// Signature of the optional `info` hook.
pub type PluginInfoFn = fn() -> &'static str;

/// A loaded plugin binding.
pub struct PluginLibrary {
    library: Library,
    functions: HashMap<String, PluginFn>,
    info: Option<String>,
    initialized: bool,
}

impl PluginLibrary {
    /// Loads the plugin image, runs its `init` hook if present, and records
    /// its `info` text for diagnostics.
    pub fn open(path: &str) -> Result<Self, BridgeError> {
        // SAFETY: loading runs the image's initializers; plugins are
        // first-party code compiled against this crate.
        let library = unsafe { Library::new(path) }
            .map_err(|err| BridgeError::load(path, err.to_string()))?;

        let mut plugin = Self {
            library,
            functions: HashMap::new(),
            info: None,
            initialized: false,
        };

        if let Some(init) = plugin.hook::<PluginHookFn>("vetra_plugin_init") {
            init();
            plugin.initialized = true;
            debug!(path, "plugin init hook ran");
        }
        if let Some(describe) = plugin.hook::<PluginInfoFn>("vetra_plugin_info") {
            let text = describe().to_string();
            info!(path, info = %text, "loaded plugin");
            plugin.info = Some(text);
        }
        Ok(plugin)
    }

    /// Whether the `init` hook ran at load time.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// The text reported by the `info` hook, if the plugin exports one.
    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    fn hook<T: Copy>(&self, symbol: &str) -> Option<T> {
        // SAFETY: hooks follow the fixed plugin convention; the plugin
        // author guarantees the signature by compiling against this crate.
        unsafe {
            self.library
                .get::<T>(symbol.as_bytes())
                .ok()
                .map(|hook| *hook)
        }
    }

    fn resolve(&mut self, function: &str) -> Result<PluginFn, BridgeError> {
        if let Some(f) = self.functions.get(function) {
            return Ok(*f);
        }
        let symbol = format!("{PLUGIN_PREFIX}{function}");
        let f = self
            .hook::<PluginFn>(&symbol)
            .ok_or_else(|| BridgeError::SymbolNotFound(function.to_string()))?;
        self.functions.insert(function.to_string(), f);
        Ok(f)
    }
}

impl LibraryInterface for PluginLibrary {
    fn kind(&self) -> LibraryKind {
        LibraryKind::Plugin
    }

    fn call(&mut self, function: &str, args: &[Value]) -> Result<Value, BridgeError> {
        let f = self.resolve(function)?;
        Ok(f(args))
    }

    fn has_function(&self, function: &str) -> bool {
        if self.functions.contains_key(function) {
            return true;
        }
        let symbol = format!("{PLUGIN_PREFIX}{function}");
        // SAFETY: lookup only.
        unsafe { self.library.get::<PluginFn>(symbol.as_bytes()).is_ok() }
    }

    fn describe(&self) -> Option<&str> {
        self.info()
    }
}

impl Drop for PluginLibrary {
    fn drop(&mut self) {
        // Cached function pointers die with this struct, so nothing can call
        // into the image after the cleanup hook runs.
        if let Some(cleanup) = self.hook::<PluginHookFn>("vetra_plugin_cleanup") {
            cleanup();
            debug!("plugin cleanup hook ran");
        }
    }
}

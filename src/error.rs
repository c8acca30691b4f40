//! Bridge error taxonomy.
//!
//! Every interface method returns an explicit `Result` with one of these
//! variants; a foreign fault is converted at the boundary where it occurs and
//! never unwinds through host stack frames. The registry downgrades load
//! failures to `false` plus a logged diagnostic, while call failures surface
//! to the evaluator as catchable runtime errors with the foreign message
//! preserved.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// No binding exists under the given alias.
    #[error("library '{0}' not loaded")]
    NotLoaded(String),

    /// The library image, module, or class could not be loaded.
    #[error("failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    /// The export or module attribute does not exist (or is not callable).
    #[error("function '{0}' not found in library")]
    SymbolNotFound(String),

    /// No candidate signature resolved to an existing managed method.
    #[error("method '{0}' not found with a compatible signature")]
    MethodNotFound(String),

    /// The foreign callee itself faulted.
    #[error("call to '{function}' failed: {reason}")]
    Invocation { function: String, reason: String },

    /// A value cannot be represented on the far side of a boundary.
    #[error("marshalling error: {0}")]
    Marshalling(String),

    /// Support for this library kind was not compiled into the host.
    #[error("{0} support not compiled in")]
    Unsupported(&'static str),
}

impl BridgeError {
    /// Load failure for the library, module, or class at `path`.
    pub fn load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Load {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Failure raised by the foreign callee itself.
    pub fn invocation(function: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Invocation {
            function: function.into(),
            reason: reason.into(),
        }
    }
}

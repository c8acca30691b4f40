//! Foreign-library bridge for the Vetra scripting host.
//!
//! Vetra scripts bind libraries with `extern "<path>" as <alias> : <kind>`
//! (or `plugin "<path>" as <alias>`) and invoke them through
//! `call_native(alias.function, arg, ...)`. The evaluator routes both forms
//! through [`registry::LibraryRegistry`], which dispatches to one of four
//! runtime-specific interfaces:
//!
//! - [`native`]: C-ABI shared libraries, with call-shape discovery from the
//!   runtime argument list;
//! - [`script`]: modules hosted by the embedded CPython interpreter
//!   (cargo feature `python`);
//! - [`managed`]: static methods on JVM classes, probed by argument shape
//!   and return-type trial (cargo feature `jvm`);
//! - [`plugin`]: first-party plugins following the fixed `vetra_` export
//!   convention.
//!
//! Values cross every boundary as [`value::Value`]; failures cross as
//! [`error::BridgeError`].

pub mod error;
#[cfg(feature = "jvm")]
pub mod managed;
pub mod native;
pub mod plugin;
pub mod registry;
#[cfg(feature = "python")]
pub mod script;
pub mod value;

pub use error::BridgeError;
pub use registry::{LibraryInterface, LibraryKind, LibraryRegistry};
pub use value::{HostCallable, Value};

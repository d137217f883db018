//! Auto-registered SQL functions for SQLite connections.
//!
//! Register Rust callables once; every connection opened through
//! [`Connection::open`] (or an [`Opener`]) arrives with all of them already
//! created, before it is returned or passed to an init callback.
//!
//! ```
//! use sqlext::{Connection, Signature, SqliteValue};
//!
//! sqlext::register_function("twice", Signature::exact(1), |args| {
//!     Ok(args.numeric(0).map(|x| SqliteValue::Float(x * 2.0)))
//! })?;
//!
//! let conn = Connection::open_in_memory()?;
//! let v: Option<f64> = conn.query_row("SELECT twice(21)", [], |row| row.get(0))?;
//! assert_eq!(v, Some(42.0));
//! let v: Option<f64> = conn.query_row("SELECT twice(NULL)", [], |row| row.get(0))?;
//! assert_eq!(v, None);
//! # Ok::<(), sqlext::ExtError>(())
//! ```
//!
//! The free functions in this module operate on the process-wide
//! [`default_registry`]. Code that wants isolation (tests, libraries)
//! can build its own [`FunctionRegistry`] and inject it with
//! [`Opener::registry`].

use std::sync::{Arc, LazyLock};

pub mod connection;
pub mod flags;
pub mod opener;
pub mod tracker;

pub use connection::Connection;
pub use flags::{OpenConfig, OpenMode};
pub use opener::Opener;
pub use rusqlite::functions::FunctionFlags;
pub use sqlext_error::{ExtError, Result};
pub use sqlext_func::{
    Args, DEFAULT_FLAGS, FunctionRegistry, FunctionSink, FunctionSpec, NullPropagating,
    ScalarFunction, Signature, math,
};
pub use sqlext_types::SqliteValue;
pub use tracker::CreatedFunctionTracker;

static DEFAULT_REGISTRY: LazyLock<Arc<FunctionRegistry>> =
    LazyLock::new(|| Arc::new(FunctionRegistry::new()));

/// The process-wide registry used by [`Connection::open`] and the free
/// functions below. Created empty on first use.
pub fn default_registry() -> Arc<FunctionRegistry> {
    Arc::clone(&DEFAULT_REGISTRY)
}

/// Register a NULL-propagating callable in the default registry.
///
/// Arguments in the first `signature.required()` positions short-circuit to
/// NULL; later ones reach the callable as `None`. Returning `None` yields
/// NULL. Replaces any earlier registration under `name`.
pub fn register_function<C>(name: impl Into<String>, signature: Signature, callable: C) -> Result<()>
where
    C: Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync + 'static,
{
    DEFAULT_REGISTRY
        .register_callable(name, signature, callable)
        .map(drop)
}

/// Register a raw creation spec in the default registry. The body sees
/// every argument as-is and `arity` reaches the engine unchecked.
pub fn register_create_function<F>(name: impl Into<String>, arity: i32, flags: FunctionFlags, body: F)
where
    F: Fn(&[SqliteValue]) -> Result<SqliteValue> + Send + Sync + 'static,
{
    DEFAULT_REGISTRY.register_raw(name, arity, flags, body);
}

/// Names in the default registry, sorted.
pub fn registered_function_names() -> Vec<String> {
    DEFAULT_REGISTRY.names()
}

/// Empty the default registry and reset its math flag.
pub fn purge_function_registrations() {
    DEFAULT_REGISTRY.purge();
}

/// Create every function in the default registry on an existing session.
///
/// Accepts a [`Connection`] (creation is tracked) or a bare
/// `rusqlite::Connection`. Returns how many functions were created.
pub fn enhance_db_session<S>(session: &S) -> Result<usize>
where
    S: FunctionSink + ?Sized,
{
    DEFAULT_REGISTRY.materialize_onto(session)
}

/// Register the math catalog in the default registry unless it already is.
pub fn register_math() -> bool {
    DEFAULT_REGISTRY.register_math()
}

/// Register the math catalog in the default registry unconditionally.
pub fn register_math_force() {
    DEFAULT_REGISTRY.register_math_force();
}

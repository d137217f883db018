//! Database connection that arrives with every registered function created.
//!
//! [`Connection`] wraps a `rusqlite::Connection` and dereferences to it, so
//! the whole engine API (`execute`, `query_row`, `prepare`, ...) is available
//! unchanged. What it adds is function bookkeeping: every function created
//! through [`Connection::create_function`], [`Connection::create_callable`]
//! or registry materialization is recorded, and can be queried with
//! [`Connection::function_created`].
//!
//! Functions created directly on the engine through `Deref` (e.g.
//! `conn.create_scalar_function(..)`) work but are not recorded.

use std::cell::RefCell;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use rusqlite::functions::FunctionFlags;
use sqlext_error::{ExtError, Result};
use sqlext_func::{Args, DEFAULT_FLAGS, FunctionRegistry, FunctionSink, FunctionSpec, Signature};
use sqlext_types::SqliteValue;
use tracing::debug;

use crate::opener::Opener;
use crate::tracker::CreatedFunctionTracker;

/// A SQLite connection with tracked function creation.
///
/// `Send` but not `Sync`, like the engine connection it wraps.
#[derive(Debug)]
pub struct Connection {
    inner: rusqlite::Connection,
    created: RefCell<CreatedFunctionTracker>,
}

impl Connection {
    /// Open `path` with the default registry's functions created on it.
    ///
    /// Equivalent to `Opener::new().open(path)`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Opener::new().open(path)
    }

    /// Open a private in-memory database with the default registry's
    /// functions created on it.
    pub fn open_in_memory() -> Result<Self> {
        Opener::new().open_in_memory()
    }

    /// Open `path`, then run `init` on the fully armed connection.
    ///
    /// An error from `init` aborts the open and the connection is dropped.
    pub fn open_with<F>(path: impl AsRef<Path>, init: F) -> Result<Self>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        Opener::new().open_with(path, init)
    }

    /// Open `path`, run `block`, then close the connection.
    ///
    /// The connection is closed whether `block` succeeds or fails; an error
    /// from `block` takes precedence over an error from closing.
    pub fn scoped<F, T>(path: impl AsRef<Path>, block: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        Opener::new().scoped(path, block)
    }

    /// Wrap an existing engine connection. No functions are created; see
    /// [`Opener::enhance`] for the materializing variant.
    #[must_use]
    pub fn from_engine(inner: rusqlite::Connection) -> Self {
        Self {
            inner,
            created: RefCell::new(CreatedFunctionTracker::new()),
        }
    }

    /// Create a raw function on this connection. The body sees every
    /// argument, NULL included; `arity` goes to the engine unchecked.
    pub fn create_function<F>(
        &self,
        name: &str,
        arity: i32,
        flags: FunctionFlags,
        body: F,
    ) -> Result<()>
    where
        F: Fn(&[SqliteValue]) -> Result<SqliteValue> + Send + Sync + 'static,
    {
        self.materialize(&FunctionSpec::new(name, arity, flags, Arc::new(body)))
    }

    /// Create a NULL-propagating callable on this connection only.
    pub fn create_callable<C>(&self, name: &str, signature: Signature, callable: C) -> Result<()>
    where
        C: Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync + 'static,
    {
        let spec = FunctionSpec::from_callable(name, signature, DEFAULT_FLAGS, callable)?;
        self.materialize(&spec)
    }

    /// Whether a function with this name (case-insensitive) was created on
    /// this connection.
    pub fn function_created(&self, name: impl AsRef<str>) -> bool {
        self.created.borrow().was_created(name)
    }

    /// Names of created functions, uppercased and sorted.
    pub fn created_function_names(&self) -> Vec<String> {
        self.created.borrow().names()
    }

    /// Create every function currently in `registry` on this connection.
    /// Returns how many were created.
    pub fn enhance(&self, registry: &FunctionRegistry) -> Result<usize> {
        registry.materialize_onto(self)
    }

    /// The wrapped engine connection.
    pub fn engine(&self) -> &rusqlite::Connection {
        &self.inner
    }

    /// Unwrap into the engine connection, discarding the creation record.
    #[must_use]
    pub fn into_engine(self) -> rusqlite::Connection {
        self.inner
    }

    /// Close the connection, reporting any engine error.
    pub fn close(self) -> Result<()> {
        let functions = self.created.borrow().len();
        self.inner
            .close()
            .map_err(|(_, err)| ExtError::from(err))?;
        debug!(functions, "connection closed");
        Ok(())
    }
}

impl Deref for Connection {
    type Target = rusqlite::Connection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FunctionSink for Connection {
    fn materialize(&self, spec: &FunctionSpec) -> Result<()> {
        self.inner.materialize(spec)?;
        self.created.borrow_mut().record(spec.name());
        Ok(())
    }
}

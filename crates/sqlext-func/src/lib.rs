//! Function registry for auto-created SQL functions.
//!
//! A [`FunctionRegistry`] holds named [`FunctionSpec`]s: everything needed to
//! call the engine's native function-creation primitive (`name`, `arity`,
//! engine flags and the body). Registering a name that is already present
//! replaces it; there is no per-name removal, only [`FunctionRegistry::purge`].
//!
//! Registries are materialized onto connections through the
//! [`FunctionSink`] seam, which the connection layer implements on top of
//! the engine.
//!
//! The registry is internally synchronized, so a single instance can be
//! shared (`Arc`) between threads that register functions and threads that
//! open connections.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rusqlite::functions::FunctionFlags;
use sqlext_error::Result;
use sqlext_types::SqliteValue;
use tracing::{debug, info};

pub mod engine;
pub mod math;
pub mod scalar;

pub use scalar::{Args, CallableFn, MAX_FUNCTION_ARG, NullPropagating, ScalarFunction, Signature};

/// Engine flags used when the caller does not supply any.
pub const DEFAULT_FLAGS: FunctionFlags = FunctionFlags::SQLITE_UTF8;

/// Everything needed to create one function on a connection.
#[derive(Clone)]
pub struct FunctionSpec {
    name: String,
    arity: i32,
    flags: FunctionFlags,
    body: Arc<dyn ScalarFunction>,
}

impl FunctionSpec {
    /// A raw creation spec. The arity is not checked against the body.
    pub fn new(
        name: impl Into<String>,
        arity: i32,
        flags: FunctionFlags,
        body: Arc<dyn ScalarFunction>,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            flags,
            body,
        }
    }

    /// A spec whose body is `callable` behind a [`NullPropagating`] adapter.
    pub fn from_callable<C>(
        name: impl Into<String>,
        signature: Signature,
        flags: FunctionFlags,
        callable: C,
    ) -> Result<Self>
    where
        C: Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync + 'static,
    {
        let name = name.into();
        signature.validate(&name)?;
        Ok(Self::null_propagating(name, signature, flags, callable))
    }

    pub(crate) fn null_propagating<C>(
        name: String,
        signature: Signature,
        flags: FunctionFlags,
        callable: C,
    ) -> Self
    where
        C: Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync + 'static,
    {
        let adapter = NullPropagating::new(name.clone(), signature, callable);
        Self::new(name, signature.engine_arity(), flags, Arc::new(adapter))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Engine arity: `>= 0` exact, `-1` any number of arguments.
    pub const fn arity(&self) -> i32 {
        self.arity
    }

    pub const fn flags(&self) -> FunctionFlags {
        self.flags
    }

    pub fn body(&self) -> &Arc<dyn ScalarFunction> {
        &self.body
    }

    /// Run the body directly, bypassing the engine.
    pub fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue> {
        self.body.invoke(args)
    }
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Target of materialization: something that can create a function natively.
///
/// Implemented for the engine connection in [`engine`] and, with creation
/// tracking, by the `sqlext` connection wrapper.
pub trait FunctionSink {
    /// Create `spec` on this target, replacing any function of the same name
    /// and arity.
    fn materialize(&self, spec: &FunctionSpec) -> Result<()>;
}

#[derive(Default)]
struct RegistryState {
    specs: BTreeMap<String, Arc<FunctionSpec>>,
    math_registered: bool,
}

impl RegistryState {
    fn insert(&mut self, spec: FunctionSpec) -> Option<Arc<FunctionSpec>> {
        debug!(
            name = %spec.name,
            arity = spec.arity,
            flags = spec.flags.bits(),
            "function registered"
        );
        self.specs.insert(spec.name.clone(), Arc::new(spec))
    }
}

/// Registry of functions to create on every new connection, keyed by the
/// raw name as supplied (last registration wins).
#[derive(Default)]
pub struct FunctionRegistry {
    state: RwLock<RegistryState>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a prepared spec. Returns the spec it replaced, if any.
    pub fn register_spec(&self, spec: FunctionSpec) -> Option<Arc<FunctionSpec>> {
        self.state.write().insert(spec)
    }

    /// Register a raw creation spec: the body sees every argument, SQL NULL
    /// included, and `arity` is passed to the engine unchecked.
    pub fn register_raw<F>(
        &self,
        name: impl Into<String>,
        arity: i32,
        flags: FunctionFlags,
        body: F,
    ) -> Option<Arc<FunctionSpec>>
    where
        F: Fn(&[SqliteValue]) -> Result<SqliteValue> + Send + Sync + 'static,
    {
        self.register_spec(FunctionSpec::new(name, arity, flags, Arc::new(body)))
    }

    /// Register a callable with NULL-propagation semantics and default flags.
    ///
    /// Fails only if `signature` cannot be expressed to the engine.
    pub fn register_callable<C>(
        &self,
        name: impl Into<String>,
        signature: Signature,
        callable: C,
    ) -> Result<Option<Arc<FunctionSpec>>>
    where
        C: Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync + 'static,
    {
        self.register_callable_with_flags(name, signature, DEFAULT_FLAGS, callable)
    }

    /// [`register_callable`](Self::register_callable) with explicit engine
    /// flags (e.g. `SQLITE_DETERMINISTIC`).
    pub fn register_callable_with_flags<C>(
        &self,
        name: impl Into<String>,
        signature: Signature,
        flags: FunctionFlags,
        callable: C,
    ) -> Result<Option<Arc<FunctionSpec>>>
    where
        C: Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync + 'static,
    {
        let spec = FunctionSpec::from_callable(name, signature, flags, callable)?;
        Ok(self.register_spec(spec))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.state.read().specs.keys().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<FunctionSpec>> {
        self.state.read().specs.get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().specs.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().specs.is_empty()
    }

    /// The specs present right now, in name order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<FunctionSpec>> {
        self.state.read().specs.values().map(Arc::clone).collect()
    }

    /// Remove every registration and forget that math was registered.
    ///
    /// Connections that already exist keep the functions they were given.
    pub fn purge(&self) {
        let mut state = self.state.write();
        let dropped = state.specs.len();
        state.specs.clear();
        state.math_registered = false;
        drop(state);
        info!(dropped, "function registrations purged");
    }

    /// Create every registered function on `sink`.
    ///
    /// Uses the entries present at call time; the lock is released before
    /// the engine is called. The first failure is returned and functions
    /// created before it stay created. Returns the number created.
    pub fn materialize_onto<S>(&self, sink: &S) -> Result<usize>
    where
        S: FunctionSink + ?Sized,
    {
        let specs = self.snapshot();
        for spec in &specs {
            sink.materialize(spec)?;
        }
        debug!(count = specs.len(), "registry materialized");
        Ok(specs.len())
    }

    /// Whether the math catalog is currently considered registered.
    #[must_use]
    pub fn math_registered(&self) -> bool {
        self.state.read().math_registered
    }

    /// Register the math catalog unless it already is. Returns whether a
    /// registration pass ran.
    ///
    /// A catalog function overwritten since the last pass stays overwritten;
    /// use [`register_math_force`](Self::register_math_force) to restore it.
    pub fn register_math(&self) -> bool {
        let mut state = self.state.write();
        if state.math_registered {
            debug!("math catalog already registered");
            return false;
        }
        Self::install_math(&mut state);
        true
    }

    /// Register the math catalog unconditionally.
    pub fn register_math_force(&self) {
        let mut state = self.state.write();
        Self::install_math(&mut state);
    }

    fn install_math(state: &mut RegistryState) {
        let catalog = math::catalog();
        let count = catalog.len();
        for spec in catalog {
            state.insert(spec);
        }
        state.math_registered = true;
        info!(count, "math catalog registered");
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("FunctionRegistry")
            .field("names", &state.specs.keys().collect::<Vec<_>>())
            .field("math_registered", &state.math_registered)
            .finish()
    }
}

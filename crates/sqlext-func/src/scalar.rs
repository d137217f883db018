//! Scalar function bodies and the NULL-propagating adapter.
//!
//! Two shapes of body can be registered:
//!
//! - a raw [`ScalarFunction`], which sees every argument exactly as the engine
//!   passed it (SQL NULL included) and must produce a [`SqliteValue`];
//! - a *callable* with a declared [`Signature`], wrapped in
//!   [`NullPropagating`]. A NULL in any required position short-circuits to
//!   NULL without calling it; NULLs in optional positions reach it as `None`
//!   through [`Args`], and a `None` result becomes NULL.
//!
//! # Send + Sync
//!
//! Bodies are shared across every connection the registry materializes onto,
//! so they are stored as `Arc<dyn ScalarFunction>` and must be thread-safe.

use std::fmt;

use sqlext_error::{ExtError, Result};
use sqlext_types::SqliteValue;
use tracing::trace;

/// Largest argument count the engine accepts for a single function
/// (`SQLITE_MAX_FUNCTION_ARG`).
pub const MAX_FUNCTION_ARG: usize = 127;

/// A scalar (row-level) SQL function body.
///
/// Implemented for every `Fn(&[SqliteValue]) -> Result<SqliteValue>` closure,
/// which is how raw creation specs are usually written.
///
/// # Error Handling
///
/// Return [`ExtError::FunctionError`] for domain errors; the engine reports
/// it as a failure of the SQL statement that called the function.
pub trait ScalarFunction: Send + Sync {
    /// Execute this function on the given arguments.
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue>;
}

impl<F> ScalarFunction for F
where
    F: Fn(&[SqliteValue]) -> Result<SqliteValue> + Send + Sync,
{
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue> {
        self(args)
    }
}

/// Declared parameter shape of a callable.
///
/// Rust has no runtime parameter reflection, so the required count that
/// drives NULL propagation is declared up front instead of inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    required: usize,
    optional: usize,
    variadic: bool,
}

impl Signature {
    /// Exactly `required` parameters, all required.
    #[must_use]
    pub const fn exact(required: usize) -> Self {
        Self {
            required,
            optional: 0,
            variadic: false,
        }
    }

    /// `required` parameters followed by up to `optional` more.
    #[must_use]
    pub const fn with_optional(required: usize, optional: usize) -> Self {
        Self {
            required,
            optional,
            variadic: false,
        }
    }

    /// `required` parameters followed by any number of optional ones.
    #[must_use]
    pub const fn variadic(required: usize) -> Self {
        Self {
            required,
            optional: 0,
            variadic: true,
        }
    }

    /// Number of leading parameters whose NULL short-circuits the call.
    pub const fn required(&self) -> usize {
        self.required
    }

    /// Number of fixed optional parameters (zero for variadic signatures).
    pub const fn optional(&self) -> usize {
        self.optional
    }

    pub const fn is_variadic(&self) -> bool {
        self.variadic
    }

    /// Arity handed to the engine: exact when every parameter is required,
    /// `-1` otherwise so the engine accepts the optional tail.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn engine_arity(&self) -> i32 {
        if self.variadic || self.optional > 0 {
            -1
        } else {
            self.required as i32
        }
    }

    /// Whether an invocation with `count` arguments fits this signature.
    pub const fn accepts(&self, count: usize) -> bool {
        count >= self.required && (self.variadic || count <= self.required + self.optional)
    }

    /// Reject signatures the engine cannot express.
    pub fn validate(&self, name: &str) -> Result<()> {
        let declared = self.required + self.optional;
        if declared > MAX_FUNCTION_ARG {
            return Err(ExtError::invalid_signature(
                name,
                format!("{declared} parameters declared, at most {MAX_FUNCTION_ARG} supported"),
            ));
        }
        Ok(())
    }

    fn expected(&self) -> String {
        if self.variadic {
            format!("at least {}", self.required)
        } else if self.optional == 0 {
            self.required.to_string()
        } else {
            format!("{} to {}", self.required, self.required + self.optional)
        }
    }
}

/// Argument view handed to NULL-propagating callables.
///
/// SQL NULL reads as `None`, the same as a position past the end of the
/// argument list.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [SqliteValue],
    required: usize,
}

impl<'a> Args<'a> {
    #[must_use]
    pub const fn new(values: &'a [SqliteValue], required: usize) -> Self {
        Self { values, required }
    }

    /// Number of arguments the SQL call supplied.
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument at `index`, or `None` for SQL NULL and absent positions.
    pub fn get(&self, index: usize) -> Option<&'a SqliteValue> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    /// Argument at `index`, failing when it is NULL or absent.
    ///
    /// Never fails for required positions.
    pub fn value(&self, index: usize) -> Result<&'a SqliteValue> {
        self.get(index).ok_or_else(|| {
            ExtError::function_error(format!("argument {index} is NULL or missing"))
        })
    }

    /// Numeric view of the argument at `index` (see
    /// [`SqliteValue::to_numeric`]).
    pub fn numeric(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(SqliteValue::to_numeric)
    }

    /// Numeric argument at `index`.
    ///
    /// Fails like [`value`](Self::value) for NULL or absent positions, and
    /// with [`ExtError::TypeMismatch`] when the value has no numeric reading.
    pub fn float(&self, index: usize) -> Result<f64> {
        let value = self.value(index)?;
        value
            .to_numeric()
            .ok_or_else(|| ExtError::type_mismatch("numeric", value.typeof_str()))
    }

    /// TEXT argument at `index`; other storage classes are a type mismatch.
    pub fn text(&self, index: usize) -> Result<&'a str> {
        let value = self.value(index)?;
        value
            .as_text()
            .ok_or_else(|| ExtError::type_mismatch("text", value.typeof_str()))
    }

    /// BLOB argument at `index`; other storage classes are a type mismatch.
    pub fn blob(&self, index: usize) -> Result<&'a [u8]> {
        let value = self.value(index)?;
        value
            .as_blob()
            .ok_or_else(|| ExtError::type_mismatch("blob", value.typeof_str()))
    }

    /// All arguments in order, NULL translated to `None`.
    pub fn iter(&self) -> impl Iterator<Item = Option<&'a SqliteValue>> + 'a {
        self.values.iter().map(|v| (!v.is_null()).then_some(v))
    }

    /// Arguments after the required prefix, NULL translated to `None`.
    pub fn optional(&self) -> impl Iterator<Item = Option<&'a SqliteValue>> + 'a {
        let skip = self.required.min(self.values.len());
        self.values[skip..]
            .iter()
            .map(|v| (!v.is_null()).then_some(v))
    }

    /// The untranslated arguments.
    pub const fn raw(&self) -> &'a [SqliteValue] {
        self.values
    }
}

/// Type-erased callable stored by [`NullPropagating`].
pub type CallableFn = dyn Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync;

/// Adapter that gives a callable SQL NULL-propagation semantics.
pub struct NullPropagating {
    name: String,
    signature: Signature,
    callable: Box<CallableFn>,
}

impl NullPropagating {
    pub fn new<C>(name: impl Into<String>, signature: Signature, callable: C) -> Self
    where
        C: Fn(&Args<'_>) -> Result<Option<SqliteValue>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            callable: Box::new(callable),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn signature(&self) -> Signature {
        self.signature
    }
}

impl fmt::Debug for NullPropagating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NullPropagating")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl ScalarFunction for NullPropagating {
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue> {
        if !self.signature.accepts(args.len()) {
            return Err(ExtError::WrongArgumentCount {
                name: self.name.clone(),
                expected: self.signature.expected(),
                actual: args.len(),
            });
        }
        let required = self.signature.required();
        if let Some(position) = args[..required].iter().position(SqliteValue::is_null) {
            trace!(name = %self.name, position, "NULL in required argument; call skipped");
            return Ok(SqliteValue::Null);
        }
        let result = (self.callable)(&Args::new(args, required))?;
        Ok(result.unwrap_or(SqliteValue::Null))
    }
}

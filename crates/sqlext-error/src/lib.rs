use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for sqlext registration and materialization.
///
/// Engine failures are carried unchanged; the remaining variants cover the
/// contract this layer adds on top of the engine (declared signatures and
/// NULL-propagating invocation).
#[derive(Error, Debug)]
pub enum ExtError {
    // === Signature Errors ===
    /// A declared callable signature cannot be expressed to the engine.
    #[error("invalid signature for function {name}: {detail}")]
    InvalidSignature { name: String, detail: String },

    /// A registered callable was invoked with an argument count outside its
    /// declared signature.
    #[error("wrong number of arguments to function {name}(): expected {expected}, got {actual}")]
    WrongArgumentCount {
        name: String,
        expected: String,
        actual: usize,
    },

    // === Invocation Errors ===
    /// SQL function domain/runtime error (analogous to `sqlite3_result_error`).
    #[error("{0}")]
    FunctionError(String),

    /// Type mismatch in typed argument access.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    // === Engine Errors ===
    /// Cannot open the database through the engine.
    #[error("unable to open database file: '{path}'")]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Any other engine failure, passed through unchanged.
    #[error(transparent)]
    Engine(#[from] rusqlite::Error),
}

impl ExtError {
    /// The engine's primary result code, if this error came from the engine.
    pub fn sqlite_error_code(&self) -> Option<rusqlite::ErrorCode> {
        match self {
            Self::Engine(err) | Self::CannotOpen { source: err, .. } => err.sqlite_error_code(),
            _ => None,
        }
    }

    /// Whether the failure originated inside the engine rather than in this
    /// layer's own contract checks.
    pub const fn is_engine(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::CannotOpen { .. })
    }

    /// Create a function domain error.
    pub fn function_error(msg: impl Into<String>) -> Self {
        Self::FunctionError(msg.into())
    }

    /// Create a signature error for `name`.
    pub fn invalid_signature(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidSignature {
            name: name.into(),
            detail: detail.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Wrap this error so the engine reports it as a SQL function failure.
    ///
    /// Engine errors that already carry a result code are handed back as-is.
    pub fn into_engine(self) -> rusqlite::Error {
        match self {
            Self::Engine(err) => err,
            other => rusqlite::Error::UserFunctionError(Box::new(other)),
        }
    }
}

/// Result type alias using `ExtError`.
pub type Result<T> = std::result::Result<T, ExtError>;

//! Connection construction with registry materialization.
//!
//! An [`Opener`] opens the engine connection, creates every function in its
//! registry on it, and only then hands it out (or passes it to an init
//! callback). Registry changes made afterwards do not reach connections that
//! already exist; use [`Connection::enhance`] for those.

use std::path::Path;
use std::sync::Arc;

use rusqlite::OpenFlags;
use sqlext_error::{ExtError, Result};
use sqlext_func::FunctionRegistry;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::flags::{OpenConfig, OpenMode};

/// Builder for armed connections.
///
/// Uses the process-wide [`default_registry`](crate::default_registry)
/// unless another registry is injected with [`Opener::registry`].
#[derive(Debug, Clone)]
pub struct Opener {
    registry: Arc<FunctionRegistry>,
    config: OpenConfig,
}

impl Default for Opener {
    fn default() -> Self {
        Self {
            registry: crate::default_registry(),
            config: OpenConfig::default(),
        }
    }
}

impl Opener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize from `registry` instead of the default one.
    #[must_use]
    pub fn registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn config(mut self, config: OpenConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// The registry this opener materializes.
    #[must_use]
    pub fn function_registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Open `path` and create every registered function on it.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Connection> {
        self.connect(path.as_ref(), self.config.to_open_flags())
    }

    /// Open a private in-memory database, ignoring the configured mode.
    pub fn open_in_memory(&self) -> Result<Connection> {
        let config = OpenConfig {
            mode: OpenMode::Memory,
            ..self.config.clone()
        };
        self.connect(Path::new(":memory:"), config.to_open_flags())
    }

    /// Open `path`, then run `init` on the armed connection.
    pub fn open_with<F>(&self, path: impl AsRef<Path>, init: F) -> Result<Connection>
    where
        F: FnOnce(&mut Connection) -> Result<()>,
    {
        let mut conn = self.open(path)?;
        init(&mut conn)?;
        Ok(conn)
    }

    /// Open `path`, run `block` on the armed connection, then close it.
    ///
    /// The block's error wins over a close error.
    pub fn scoped<F, T>(&self, path: impl AsRef<Path>, block: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.open(path)?;
        let outcome = block(&mut conn);
        let closed = conn.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    /// Wrap an existing engine connection and create every registered
    /// function on it.
    pub fn enhance(&self, engine: rusqlite::Connection) -> Result<Connection> {
        let conn = Connection::from_engine(engine);
        conn.enhance(&self.registry)?;
        Ok(conn)
    }

    fn connect(&self, path: &Path, flags: OpenFlags) -> Result<Connection> {
        debug!(path = %path.display(), flags = flags.bits(), "opening connection");
        let engine = rusqlite::Connection::open_with_flags(path, flags).map_err(|source| {
            ExtError::CannotOpen {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let conn = self.enhance(engine)?;
        info!(
            path = %path.display(),
            functions = conn.created_function_names().len(),
            "connection opened"
        );
        Ok(conn)
    }
}

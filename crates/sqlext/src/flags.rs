//! Open configuration, mapped onto `rusqlite::OpenFlags`.

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Open an existing database for reading only.
    ReadOnly,
    /// Open an existing database for reading and writing.
    ReadWrite,
    /// Read-write, creating the database if it does not exist.
    #[default]
    ReadWriteCreate,
    /// A private in-memory database; the path only names it.
    Memory,
}

/// Connection open options.
///
/// Defaults match `rusqlite::Connection::open`: read-write-create with URI
/// filenames and without the per-connection mutex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenConfig {
    pub mode: OpenMode,
    /// Interpret `file:` paths as URIs.
    pub uri: bool,
    /// Open in multi-thread mode (the connection is never shared).
    pub no_mutex: bool,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            mode: OpenMode::default(),
            uri: true,
            no_mutex: true,
        }
    }
}

impl OpenConfig {
    /// Configuration for an in-memory database.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            mode: OpenMode::Memory,
            ..Self::default()
        }
    }

    /// Engine flags for this configuration.
    #[must_use]
    pub fn to_open_flags(&self) -> OpenFlags {
        let mut flags = match self.mode {
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadWriteCreate => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
            OpenMode::Memory => {
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_MEMORY
            }
        };
        if self.uri {
            flags |= OpenFlags::SQLITE_OPEN_URI;
        }
        if self.no_mutex {
            flags |= OpenFlags::SQLITE_OPEN_NO_MUTEX;
        }
        flags
    }
}

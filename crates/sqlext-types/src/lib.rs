//! Value model shared by the sqlext crates.
//!
//! [`SqliteValue`] is what registered function bodies receive and return. It
//! converts to and from the engine's own value types so bodies never touch
//! `rusqlite` directly.

pub mod value;

pub use value::SqliteValue;

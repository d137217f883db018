//! Per-connection record of functions created through this layer.

use std::collections::BTreeSet;

/// Lookup key: trimmed, ASCII-uppercased name.
fn name_key(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Case-insensitive set of function names created on one connection.
#[derive(Debug, Default, Clone)]
pub struct CreatedFunctionTracker {
    names: BTreeSet<String>,
}

impl CreatedFunctionTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name`. Returns `false` if it was already present.
    pub fn record(&mut self, name: &str) -> bool {
        self.names.insert(name_key(name))
    }

    /// Whether a function with this name (any case) was created.
    pub fn was_created(&self, name: impl AsRef<str>) -> bool {
        self.names.contains(&name_key(name.as_ref()))
    }

    /// Recorded names in normalized (uppercase) form, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

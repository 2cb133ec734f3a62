//! Canonical node keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deterministic identity of a real-world entity.
///
/// `family` scopes the key space (two families never collide); display
/// form is `namespace:local`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalKey {
    pub family: String,
    pub namespace: String,
    pub local: String,
}

impl CanonicalKey {
    pub fn new(
        family: impl Into<String>,
        namespace: impl Into<String>,
        local: impl Into<String>,
    ) -> Self {
        CanonicalKey {
            family: family.into(),
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.local)
    }
}

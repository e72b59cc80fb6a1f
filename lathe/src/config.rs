//! Factory configuration.

use crate::error::LatheResult;
use serde::{Deserialize, Serialize};

/// Default bound on nested constructions.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration for a [`Factory`](crate::Factory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Maximum nesting of constructions triggered by association
    /// references. Exceeding it fails with `DepthExceeded`.
    pub max_depth: usize,
    /// Reload each object from the store after saving it. Reload failures
    /// are logged and ignored.
    pub refresh_after_save: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            refresh_after_save: true,
        }
    }
}

impl FactoryConfig {
    /// Parses a config from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> LatheResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

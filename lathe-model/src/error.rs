//! Error types for schema lookups.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while consulting the schema catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The type was never registered with the catalog.
    #[error("unknown entity type: {0}")]
    UnknownType(String),

    /// Following parent links from the type loops back on itself.
    #[error("cyclic type hierarchy at {0}")]
    CyclicHierarchy(String),
}

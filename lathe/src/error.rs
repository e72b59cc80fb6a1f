//! Error types for blueprint evaluation and construction.

use crate::blueprint::BlueprintName;
use lathe_model::ModelError;
use lathe_storage::StorageError;
use thiserror::Error;

/// Result type for construction operations.
pub type LatheResult<T> = Result<T, LatheError>;

/// Errors that can occur while building fixtures.
#[derive(Debug, Error)]
pub enum LatheError {
    /// Neither the type nor any of its ancestors has the blueprint.
    #[error("no blueprint {blueprint} for {entity_type}")]
    NoBlueprintFound {
        entity_type: String,
        blueprint: BlueprintName,
    },

    /// The store refused to save the object.
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// Schema lookup failed (unknown type, broken hierarchy).
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// A bare attribute reference named no association and no generator.
    #[error("no generator named {0:?}")]
    NoGenerator(String),

    /// Every attempt collided with an already emitted value.
    #[error("generator {name:?} produced no new value after {attempts} attempts")]
    GeneratorExhausted { name: String, attempts: usize },

    /// A named blueprint was requested for an attribute that is not an
    /// association.
    #[error("{attribute:?} is not an association of {entity_type}")]
    UnknownAssociation {
        entity_type: String,
        attribute: String,
    },

    /// Nested construction went deeper than the configured limit.
    #[error("construction nested deeper than {0} levels")]
    DepthExceeded(usize),

    /// A blueprint producer reported a failure.
    #[error("producer for {attribute:?} failed: {message}")]
    Producer { attribute: String, message: String },

    /// Configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// A thread panicked while holding a registry lock.
    #[error("registry lock poisoned")]
    LockPoisoned,
}

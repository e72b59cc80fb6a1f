//! Core type definitions for lathe.
//!
//! This crate defines the identifier types shared by the model, storage and
//! engine crates:
//! - Entity identifiers (UUID v7 text by default, any non-empty key allowed)
//!
//! Schema metadata and attribute values live in `lathe-model`; nothing
//! backend-specific belongs here.

mod ids;

pub use ids::EntityId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid entity id: {0:?}")]
    InvalidId(String),
}

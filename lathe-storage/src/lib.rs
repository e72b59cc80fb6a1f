//! Persistence providers for lathe.
//!
//! The fixture engine saves what it builds through the [`EntityStore`]
//! contract and never looks behind it. Two providers ship with the crate:
//!
//! - [`MemoryStore`]: a document store held in process memory, keyed by the
//!   entity's UUID.
//! - [`SqliteStore`]: a relational store on SQLite that assigns numeric row
//!   keys to new records.
//!
//! Both can be made strict with a [`SchemaCatalog`](lathe_model::SchemaCatalog),
//! in which case attributes the schema does not declare are rejected at
//! persist time.

mod document;
mod error;
mod memory;
mod sqlite;

pub use document::{entity_from_document, merge_document};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use lathe_model::{Entity, SchemaCatalog};
use lathe_types::EntityId;

/// A backing store the fixture engine can save entities into.
pub trait EntityStore: Send + Sync {
    /// Saves the entity and marks it persisted. May assign a new identity.
    fn persist(&self, entity: &mut Entity) -> StorageResult<()>;

    /// Reloads stored attributes onto the in-memory entity.
    fn refresh(&self, entity: &mut Entity) -> StorageResult<()>;

    /// Loads a stored entity by id.
    fn get(&self, id: &EntityId) -> StorageResult<Option<Entity>>;

    /// Number of stored entities whose concrete type is `entity_type`.
    fn count(&self, entity_type: &str) -> StorageResult<usize>;

    /// Removes every stored entity.
    fn clear(&self) -> StorageResult<()>;
}

/// Rejects attributes the catalog does not know for the entity's type.
pub(crate) fn check_attributes(catalog: &SchemaCatalog, entity: &Entity) -> StorageResult<()> {
    for name in entity.attributes.keys() {
        if !catalog.knows_attribute(&entity.entity_type, name) {
            return Err(StorageError::UnknownAttribute {
                entity_type: entity.entity_type.clone(),
                attribute: name.to_string(),
            });
        }
    }
    Ok(())
}

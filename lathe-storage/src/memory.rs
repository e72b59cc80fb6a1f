//! In-memory document store.

use crate::document::{entity_from_document, merge_document};
use crate::{EntityStore, StorageError, StorageResult, check_attributes};
use lathe_model::{Entity, SchemaCatalog};
use lathe_types::EntityId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Document store kept in process memory.
///
/// Entities keep the identity they were built with; documents are stored
/// exactly as [`Entity::to_document`] renders them.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<EntityId, serde_json::Value>>,
    schema: Option<Arc<SchemaCatalog>>,
}

impl MemoryStore {
    /// Creates an empty store that accepts any attribute.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects attributes the catalog does not
    /// declare.
    #[must_use]
    pub fn strict(schema: Arc<SchemaCatalog>) -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            schema: Some(schema),
        }
    }

    /// Total number of stored documents across all types.
    pub fn len(&self) -> usize {
        self.documents().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn documents(&self) -> StorageResult<MutexGuard<'_, HashMap<EntityId, serde_json::Value>>> {
        self.documents.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl EntityStore for MemoryStore {
    fn persist(&self, entity: &mut Entity) -> StorageResult<()> {
        if let Some(schema) = &self.schema {
            check_attributes(schema, entity)?;
        }
        let doc = entity.to_document();
        self.documents()?.insert(entity.id.clone(), doc);
        entity.persisted = true;
        debug!("Stored {} {}", entity.entity_type, entity.id);
        Ok(())
    }

    fn refresh(&self, entity: &mut Entity) -> StorageResult<()> {
        let docs = self.documents()?;
        let doc = docs
            .get(&entity.id)
            .ok_or_else(|| StorageError::NotFound(entity.id.to_string()))?;
        merge_document(entity, doc)
    }

    fn get(&self, id: &EntityId) -> StorageResult<Option<Entity>> {
        let doc = self.documents()?.get(id).cloned();
        doc.map(entity_from_document).transpose()
    }

    fn count(&self, entity_type: &str) -> StorageResult<usize> {
        Ok(self
            .documents()?
            .values()
            .filter(|doc| doc["_type"] == entity_type)
            .count())
    }

    fn clear(&self) -> StorageResult<()> {
        self.documents()?.clear();
        Ok(())
    }
}

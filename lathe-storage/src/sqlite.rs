//! Relational store on SQLite.

use crate::document::{entity_from_document, merge_document};
use crate::{EntityStore, StorageError, StorageResult, check_attributes};
use lathe_model::{Entity, SchemaCatalog};
use lathe_types::EntityId;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Relational store backed by SQLite.
///
/// New records receive the next numeric row key as their identity unless the
/// blueprint assigned an explicit `id`. An explicit numeric `id` becomes the
/// row key itself.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    schema: Option<Arc<SchemaCatalog>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Rejects attributes the catalog does not declare on every later persist.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<SchemaCatalog>) -> Self {
        self.schema = Some(schema);
        self
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entities (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                entity_type TEXT NOT NULL,
                document TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entities_type ON entities(entity_type);
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn load_document(conn: &Connection, id: &EntityId) -> StorageResult<Option<serde_json::Value>> {
        let text: Option<String> = conn
            .query_row(
                "SELECT document FROM entities WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        text.map(|t| serde_json::from_str(&t).map_err(Into::into))
            .transpose()
    }
}

impl EntityStore for SqliteStore {
    fn persist(&self, entity: &mut Entity) -> StorageResult<()> {
        if let Some(schema) = &self.schema {
            check_attributes(schema, entity)?;
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        if entity.persisted {
            let doc = serde_json::to_string(&entity.to_document())?;
            let updated = tx.execute(
                "UPDATE entities SET document = ?1 WHERE id = ?2",
                params![doc, entity.id.as_str()],
            )?;
            if updated == 0 {
                return Err(StorageError::NotFound(entity.id.to_string()));
            }
        } else {
            let explicit_id = entity.attributes.contains_key("id");
            let doc = serde_json::to_string(&entity.to_document())?;
            match entity.id.as_row().filter(|_| explicit_id) {
                // A numeric key is the row key, so later rows never reuse it.
                Some(row) => {
                    tx.execute(
                        "INSERT INTO entities (row_id, id, entity_type, document)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![row, entity.id.as_str(), entity.entity_type, doc],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO entities (id, entity_type, document) VALUES (?1, ?2, ?3)",
                        params![entity.id.as_str(), entity.entity_type, doc],
                    )?;
                }
            }
            if !explicit_id {
                let provisional = entity.id.clone();
                entity.id = EntityId::from_row(tx.last_insert_rowid());
                let doc = serde_json::to_string(&entity.to_document())?;
                tx.execute(
                    "UPDATE entities SET id = ?1, document = ?2 WHERE id = ?3",
                    params![entity.id.as_str(), doc, provisional.as_str()],
                )?;
            }
        }

        tx.commit()?;
        entity.persisted = true;
        debug!("Stored {} row {}", entity.entity_type, entity.id);
        Ok(())
    }

    fn refresh(&self, entity: &mut Entity) -> StorageResult<()> {
        let conn = self.conn()?;
        let doc = Self::load_document(&conn, &entity.id)?
            .ok_or_else(|| StorageError::NotFound(entity.id.to_string()))?;
        merge_document(entity, &doc)
    }

    fn get(&self, id: &EntityId) -> StorageResult<Option<Entity>> {
        let conn = self.conn()?;
        Self::load_document(&conn, id)?
            .map(entity_from_document)
            .transpose()
    }

    fn count(&self, entity_type: &str) -> StorageResult<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM entities WHERE entity_type = ?1",
            params![entity_type],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    fn clear(&self) -> StorageResult<()> {
        self.conn()?.execute("DELETE FROM entities", [])?;
        Ok(())
    }
}

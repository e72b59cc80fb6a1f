//! Backend adapters: how a persistence backend describes associations.
//!
//! The evaluation engine never reads association metadata itself. It asks
//! the factory's adapter whether an attribute is an association, which type
//! it relates to, and, for plans, how assigned attributes look once
//! associations are replaced by foreign keys.

use crate::lathe::Lathe;
use lathe_model::{
    Association, AssociationKind, AttributeMap, AttributeValue, Entity, SchemaCatalog,
};
use lathe_types::EntityId;
use std::sync::Arc;

/// Association semantics of one persistence backend.
pub trait BackendAdapter: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// True when `attribute` is an association of the object's type.
    fn has_association(&self, object: &Entity, attribute: &str) -> bool;

    /// The related type of an association attribute.
    fn class_for_association(&self, object: &Entity, attribute: &str) -> Option<String>;

    /// The attributes the lathe assigned, with every non-null belongs-to
    /// value replaced by `{foreign_key: related id}`.
    fn assigned_attributes_without_associations(&self, lathe: &Lathe) -> AttributeMap;
}

/// Shared flattening walk: `belongs_to` resolves an attribute to its
/// foreign key, `key` renders an identity as the backend stores it.
fn flatten_assigned(
    lathe: &Lathe,
    belongs_to: impl Fn(&str) -> Option<String>,
    key: impl Fn(&EntityId) -> serde_json::Value,
) -> AttributeMap {
    let mut attributes = AttributeMap::new();
    for (name, value) in lathe.assigned_attributes() {
        match belongs_to(name) {
            Some(foreign_key) if !value.is_null() => {
                let id = match value {
                    AttributeValue::Entity(related) => key(&related.id),
                    AttributeValue::Json(scalar) => scalar.clone(),
                };
                attributes.insert(foreign_key, id);
            }
            _ => {
                attributes.insert(name, value.clone());
            }
        }
    }
    attributes
}

/// Adapter for document stores such as [`MemoryStore`](lathe_storage::MemoryStore).
///
/// Every association kind counts, embedded documents included. Identities
/// are stored as strings.
#[derive(Debug, Clone)]
pub struct DocumentAdapter {
    catalog: Arc<SchemaCatalog>,
}

impl DocumentAdapter {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    fn association(&self, object: &Entity, attribute: &str) -> Option<&Association> {
        self.catalog.association(&object.entity_type, attribute)
    }
}

impl BackendAdapter for DocumentAdapter {
    fn name(&self) -> &'static str {
        "document"
    }

    fn has_association(&self, object: &Entity, attribute: &str) -> bool {
        self.association(object, attribute).is_some()
    }

    fn class_for_association(&self, object: &Entity, attribute: &str) -> Option<String> {
        self.association(object, attribute).map(Association::related_type)
    }

    fn assigned_attributes_without_associations(&self, lathe: &Lathe) -> AttributeMap {
        let object = lathe.object();
        flatten_assigned(
            lathe,
            |name| {
                self.association(object, name)
                    .filter(|a| a.is_belongs_to())
                    .map(Association::foreign_key)
            },
            |id| serde_json::Value::String(id.to_string()),
        )
    }
}

/// Adapter for relational stores such as [`SqliteStore`](lathe_storage::SqliteStore).
///
/// Only table relations count as associations; an embedded document is a
/// plain column. Numeric row keys are stored as numbers.
#[derive(Debug, Clone)]
pub struct RelationalAdapter {
    catalog: Arc<SchemaCatalog>,
}

impl RelationalAdapter {
    pub fn new(catalog: Arc<SchemaCatalog>) -> Self {
        Self { catalog }
    }

    fn reflect_on_association(&self, object: &Entity, attribute: &str) -> Option<&Association> {
        self.catalog
            .association(&object.entity_type, attribute)
            .filter(|a| a.kind != AssociationKind::Embedded)
    }
}

impl BackendAdapter for RelationalAdapter {
    fn name(&self) -> &'static str {
        "relational"
    }

    fn has_association(&self, object: &Entity, attribute: &str) -> bool {
        self.reflect_on_association(object, attribute).is_some()
    }

    fn class_for_association(&self, object: &Entity, attribute: &str) -> Option<String> {
        self.reflect_on_association(object, attribute)
            .map(Association::related_type)
    }

    fn assigned_attributes_without_associations(&self, lathe: &Lathe) -> AttributeMap {
        let object = lathe.object();
        flatten_assigned(
            lathe,
            |name| {
                self.reflect_on_association(object, name)
                    .filter(|a| a.is_belongs_to())
                    .map(Association::foreign_key)
            },
            |id| match id.as_row() {
                Some(row) => serde_json::Value::from(row),
                None => serde_json::Value::String(id.to_string()),
            },
        )
    }
}

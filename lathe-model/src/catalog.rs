//! The schema catalog: every known entity type and its place in the hierarchy.

use crate::entity::ID_ATTRIBUTE;
use crate::{Association, Entity, EntitySchema, FieldDef, ModelError, ModelResult};
use std::collections::HashMap;

/// Registry of entity schemas keyed by type name.
///
/// Parent links form the single-table-inheritance hierarchy: fields and
/// associations declared on an ancestor apply to its subtypes, and the
/// nearest declaration wins.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, EntitySchema>,
}

impl SchemaCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, replacing any previous one for the same type.
    pub fn register(&mut self, schema: EntitySchema) -> &mut Self {
        self.schemas.insert(schema.entity_type.clone(), schema);
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, schema: EntitySchema) -> Self {
        self.register(schema);
        self
    }

    pub fn schema(&self, entity_type: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity_type)
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.schemas.contains_key(entity_type)
    }

    pub fn parent_of(&self, entity_type: &str) -> Option<&str> {
        self.schemas.get(entity_type)?.parent.as_deref()
    }

    /// The type followed by its ancestors, nearest first.
    ///
    /// A parent that is not itself registered ends the chain; it lies
    /// outside the managed hierarchy.
    pub fn ancestors(&self, entity_type: &str) -> ModelResult<Vec<&EntitySchema>> {
        let mut chain: Vec<&EntitySchema> = Vec::new();
        let mut current = self
            .schemas
            .get(entity_type)
            .ok_or_else(|| ModelError::UnknownType(entity_type.to_string()))?;
        loop {
            if chain.iter().any(|s| s.entity_type == current.entity_type) {
                return Err(ModelError::CyclicHierarchy(current.entity_type.clone()));
            }
            chain.push(current);
            match current.parent.as_deref().and_then(|p| self.schemas.get(p)) {
                Some(parent) => current = parent,
                None => return Ok(chain),
            }
        }
    }

    /// True when `entity_type` is `ancestor` or inherits from it.
    pub fn is_a(&self, entity_type: &str, ancestor: &str) -> bool {
        self.ancestors(entity_type)
            .map(|chain| chain.iter().any(|s| s.entity_type == ancestor))
            .unwrap_or(false)
    }

    /// Association metadata for an attribute, searching ancestors.
    pub fn association(&self, entity_type: &str, attribute: &str) -> Option<&Association> {
        self.ancestors(entity_type)
            .ok()?
            .into_iter()
            .find_map(|s| s.find_association(attribute))
    }

    /// Field metadata for an attribute, searching ancestors.
    pub fn field(&self, entity_type: &str, attribute: &str) -> Option<&FieldDef> {
        self.ancestors(entity_type)
            .ok()?
            .into_iter()
            .find_map(|s| s.find_field(attribute))
    }

    /// True when the attribute is declared on the type or an ancestor, either
    /// as a field, an association, or a belongs-to foreign key.
    pub fn knows_attribute(&self, entity_type: &str, attribute: &str) -> bool {
        if attribute == ID_ATTRIBUTE {
            return true;
        }
        let Ok(chain) = self.ancestors(entity_type) else {
            return false;
        };
        chain.iter().any(|s| {
            s.find_field(attribute).is_some()
                || s.associations
                    .iter()
                    .any(|a| a.name == attribute || (a.is_belongs_to() && a.foreign_key() == attribute))
        })
    }

    /// A fresh, unsaved instance of the type with field defaults applied.
    ///
    /// Defaults are applied from the root of the hierarchy down so a subtype's
    /// default overrides its ancestor's.
    pub fn blank(&self, entity_type: &str) -> ModelResult<Entity> {
        let chain = self.ancestors(entity_type)?;
        let mut entity = Entity::new(entity_type);
        for schema in chain.iter().rev() {
            for field in &schema.fields {
                if let Some(default) = &field.default {
                    entity.assign(field.name.clone(), default.clone());
                }
            }
        }
        Ok(entity)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

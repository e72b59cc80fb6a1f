use crate::{AttributeMap, AttributeValue};
use lathe_types::EntityId;
use serde::{Deserialize, Serialize};

/// Attribute name that doubles as the entity's identity.
pub const ID_ATTRIBUTE: &str = "id";

/// An object built by a blueprint.
///
/// `entity_type` is always the concrete type that was requested, even when
/// the blueprint and schema defaults were inherited from an ancestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: String,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default)]
    pub persisted: bool,
}

impl Entity {
    /// A new, unsaved entity with no attributes.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            entity_type: entity_type.into(),
            attributes: AttributeMap::new(),
            persisted: false,
        }
    }

    /// True until a store has saved the entity.
    pub fn is_new_record(&self) -> bool {
        !self.persisted
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.attributes.get(attribute)
    }

    /// Sets an attribute. Assigning a non-empty string to `id` also replaces
    /// the entity's identity.
    pub fn assign(&mut self, attribute: impl Into<String>, value: impl Into<AttributeValue>) {
        let attribute = attribute.into();
        let value = value.into();
        if attribute == ID_ATTRIBUTE {
            let key = match &value {
                AttributeValue::Json(serde_json::Value::String(s)) => EntityId::parse(s).ok(),
                AttributeValue::Json(serde_json::Value::Number(n)) => {
                    n.as_i64().map(EntityId::from_row)
                }
                _ => None,
            };
            if let Some(id) = key {
                self.id = id;
            }
        }
        self.attributes.insert(attribute, value);
    }

    /// Extract a string attribute.
    pub fn get_str(&self, attribute: &str) -> Option<&str> {
        self.get(attribute).and_then(AttributeValue::as_str)
    }

    /// Extract a boolean attribute.
    pub fn get_bool(&self, attribute: &str) -> Option<bool> {
        self.get(attribute).and_then(AttributeValue::as_bool)
    }

    /// Extract a numeric attribute.
    pub fn get_number(&self, attribute: &str) -> Option<f64> {
        self.get(attribute).and_then(AttributeValue::as_f64)
    }

    /// Extract a related entity held by an association attribute.
    pub fn get_entity(&self, attribute: &str) -> Option<&Entity> {
        self.get(attribute).and_then(AttributeValue::as_entity)
    }

    /// The document a store writes: attributes with related entities
    /// collapsed to their ids, plus `_id` and `_type`.
    pub fn to_document(&self) -> serde_json::Value {
        let mut doc = self.attributes.to_json();
        doc.insert("_id".into(), self.id.to_string().into());
        doc.insert("_type".into(), self.entity_type.clone().into());
        serde_json::Value::Object(doc)
    }
}

//! Conversions between entities and stored JSON documents.

use crate::{StorageError, StorageResult};
use lathe_model::{AttributeValue, Entity};
use lathe_types::EntityId;

const ID_KEY: &str = "_id";
const TYPE_KEY: &str = "_type";

/// Rebuilds a persisted entity from its stored document.
///
/// Association attributes come back as the stored id scalar; live related
/// entities are not reloaded.
pub fn entity_from_document(doc: serde_json::Value) -> StorageResult<Entity> {
    let serde_json::Value::Object(mut map) = doc else {
        return Err(StorageError::InvalidData("document is not an object".into()));
    };
    let id = match map.remove(ID_KEY) {
        Some(serde_json::Value::String(s)) => EntityId::parse(&s)
            .map_err(|e| StorageError::InvalidData(e.to_string()))?,
        _ => return Err(StorageError::InvalidData("document has no _id".into())),
    };
    let entity_type = match map.remove(TYPE_KEY) {
        Some(serde_json::Value::String(s)) => s,
        _ => return Err(StorageError::InvalidData("document has no _type".into())),
    };
    let mut entity = Entity::new(entity_type);
    entity.id = id;
    for (k, v) in map {
        entity.attributes.insert(k, v);
    }
    entity.persisted = true;
    Ok(entity)
}

/// Copies stored attribute values onto an in-memory entity.
///
/// A related entity whose id matches the stored scalar is kept live rather
/// than replaced by the id.
pub fn merge_document(entity: &mut Entity, doc: &serde_json::Value) -> StorageResult<()> {
    let serde_json::Value::Object(map) = doc else {
        return Err(StorageError::InvalidData("document is not an object".into()));
    };
    for (k, v) in map {
        if k == ID_KEY || k == TYPE_KEY {
            continue;
        }
        let keep_live = matches!(
            (entity.get(k), v),
            (Some(AttributeValue::Entity(related)), serde_json::Value::String(id))
                if related.id.as_str() == id
        );
        if !keep_live {
            entity.attributes.insert(k.clone(), v.clone());
        }
    }
    entity.persisted = true;
    Ok(())
}

//! Entity and schema metadata for lathe.
//!
//! Defines the types the fixture engine reads and writes but does not own:
//! - [`Entity`]: a built object (id, concrete type, ordered attributes, persisted flag)
//! - [`AttributeValue`] / [`AttributeMap`]: attribute payloads, either JSON or a live related entity
//! - [`EntitySchema`]: declares a type's parent, fields (with defaults) and associations
//! - [`SchemaCatalog`]: the type hierarchy, used for inheritance lookups and blank instances
//!
//! These types are the contract between the engine, the backend adapters and
//! the stores. The engine only consults association metadata through an
//! adapter.

mod catalog;
mod entity;
mod error;
mod schema;
mod value;

pub use catalog::SchemaCatalog;
pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use schema::{Association, AssociationKind, EntitySchema, FieldDef, FieldType};
pub use value::{AttributeMap, AttributeValue};

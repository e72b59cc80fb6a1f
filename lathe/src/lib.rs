//! Blueprint-driven fixture construction.
//!
//! A [`Factory`] holds blueprints: ordered recipes of how each attribute of
//! an entity type gets its value. Building an object runs a [`Lathe`] over
//! the blueprint, assigning attributes one at a time so later ones can read
//! earlier ones, building related objects through association references,
//! and drawing unique values from named generators.
//!
//! ```no_run
//! use lathe::{Association, EntitySchema, Factory, FieldDef, SchemaCatalog, generator};
//!
//! # fn main() -> lathe::LatheResult<()> {
//! let catalog = SchemaCatalog::new()
//!     .with(EntitySchema::new("Person").field(FieldDef::text("name")))
//!     .with(
//!         EntitySchema::new("Post")
//!             .field(FieldDef::text("title"))
//!             .association(Association::belongs_to("author").with_class_name("Person")),
//!     );
//!
//! let factory = Factory::document(catalog);
//! factory.generators().define("name", generator::sequence("Person {n}"))?;
//! factory.blueprint("Person", |b| {
//!     b.reference("name");
//! })?;
//! factory.blueprint("Post", |b| {
//!     b.value("title", "Hello").reference("author");
//! })?;
//!
//! let post = factory.make("Post")?;
//! assert!(post.get_entity("author").is_some());
//! # Ok(())
//! # }
//! ```
//!
//! Three ways to build:
//!
//! - [`Factory::make`]: build and save, including related objects.
//! - [`Factory::make_unsaved`]: build without saving anything in the graph.
//! - [`Factory::plan`]: the attributes as the store would see them, with
//!   associations flattened to foreign keys.

mod adapter;
mod blueprint;
mod config;
mod context;
mod error;
mod factory;
pub mod generator;
mod lathe;

pub use adapter::{BackendAdapter, DocumentAdapter, RelationalAdapter};
pub use blueprint::{
    Blueprint, BlueprintBuilder, BlueprintName, BlueprintRegistry, Definition, ProducerFn,
};
pub use config::{DEFAULT_MAX_DEPTH, FactoryConfig};
pub use context::{ConstructionContext, SuppressionGuard, with_save_suppressed};
pub use error::{LatheError, LatheResult};
pub use factory::{Construction, Factory};
pub use generator::{GeneratorRegistry, generators};
pub use lathe::{Lathe, Scope};

pub use lathe_model::{
    Association, AssociationKind, AttributeMap, AttributeValue, Entity, EntitySchema, FieldDef,
    FieldType, SchemaCatalog,
};
pub use lathe_storage::{EntityStore, MemoryStore, SqliteStore, StorageError, StorageResult};
pub use lathe_types::EntityId;

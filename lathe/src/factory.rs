//! The construction facade: `make`, `make_unsaved` and `plan`.

use crate::adapter::{BackendAdapter, DocumentAdapter, RelationalAdapter};
use crate::blueprint::{Blueprint, BlueprintBuilder, BlueprintName, BlueprintRegistry};
use crate::config::FactoryConfig;
use crate::context::ConstructionContext;
use crate::error::LatheResult;
use crate::generator::{GeneratorRegistry, generators};
use crate::lathe::Lathe;
use lathe_model::{AttributeMap, AttributeValue, Entity, SchemaCatalog};
use lathe_storage::{EntityStore, MemoryStore, SqliteStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// What to build: a type, a blueprint and call-time overrides.
#[derive(Debug, Clone)]
pub(crate) struct Request {
    pub(crate) entity_type: String,
    pub(crate) blueprint: BlueprintName,
    pub(crate) overrides: AttributeMap,
}

impl Request {
    pub(crate) fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            blueprint: BlueprintName::Default,
            overrides: AttributeMap::new(),
        }
    }

    pub(crate) fn blueprint(mut self, blueprint: BlueprintName) -> Self {
        self.blueprint = blueprint;
        self
    }
}

/// Builds fixtures from blueprints against one schema, adapter and store.
///
/// Blueprints are registered on the factory itself, so independent factories
/// never see each other's definitions. Generators default to the
/// process-wide registry.
pub struct Factory {
    catalog: Arc<SchemaCatalog>,
    adapter: Arc<dyn BackendAdapter>,
    store: Arc<dyn EntityStore>,
    blueprints: BlueprintRegistry,
    generators: Arc<GeneratorRegistry>,
    config: FactoryConfig,
}

impl Factory {
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        adapter: Arc<dyn BackendAdapter>,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        Self {
            catalog,
            adapter,
            store,
            blueprints: BlueprintRegistry::new(),
            generators: generators(),
            config: FactoryConfig::default(),
        }
    }

    /// A factory over a fresh in-memory document store.
    pub fn document(catalog: SchemaCatalog) -> Self {
        let catalog = Arc::new(catalog);
        let adapter = Arc::new(DocumentAdapter::new(Arc::clone(&catalog)));
        Self::new(catalog, adapter, Arc::new(MemoryStore::new()))
    }

    /// A factory over a SQLite store.
    pub fn relational(catalog: SchemaCatalog, store: SqliteStore) -> Self {
        let catalog = Arc::new(catalog);
        let adapter = Arc::new(RelationalAdapter::new(Arc::clone(&catalog)));
        Self::new(catalog, adapter, Arc::new(store))
    }

    #[must_use]
    pub fn with_config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a private generator registry instead of the process-wide one.
    #[must_use]
    pub fn with_generators(mut self, generators: Arc<GeneratorRegistry>) -> Self {
        self.generators = generators;
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn adapter(&self) -> &dyn BackendAdapter {
        self.adapter.as_ref()
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn blueprints(&self) -> &BlueprintRegistry {
        &self.blueprints
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    // ── Blueprints ───────────────────────────────────────────────

    /// Defines (or replaces) the default blueprint of a type.
    pub fn blueprint(
        &self,
        entity_type: &str,
        define: impl FnOnce(&mut BlueprintBuilder),
    ) -> LatheResult<&Self> {
        self.blueprints
            .register(entity_type, BlueprintName::Default, Blueprint::build(define))?;
        Ok(self)
    }

    /// Defines (or replaces) a named blueprint of a type.
    pub fn named_blueprint(
        &self,
        entity_type: &str,
        name: &str,
        define: impl FnOnce(&mut BlueprintBuilder),
    ) -> LatheResult<&Self> {
        self.blueprints
            .register(entity_type, BlueprintName::named(name), Blueprint::build(define))?;
        Ok(self)
    }

    /// Removes every blueprint defined directly on the type.
    pub fn clear_blueprints(&self, entity_type: &str) -> LatheResult<()> {
        self.blueprints.clear_all(entity_type)
    }

    // ── Construction ─────────────────────────────────────────────

    /// Starts a construction with a blueprint name or overrides.
    pub fn construct(&self, entity_type: &str) -> Construction<'_> {
        Construction {
            factory: self,
            request: Request::new(entity_type),
        }
    }

    /// Builds and saves an object from the type's default blueprint.
    pub fn make(&self, entity_type: &str) -> LatheResult<Entity> {
        self.construct(entity_type).make()
    }

    /// Builds an object without saving it or anything it builds.
    pub fn make_unsaved(&self, entity_type: &str) -> LatheResult<Entity> {
        self.construct(entity_type).make_unsaved()
    }

    /// Builds the attributes an object would get, flattened for storage.
    pub fn plan(&self, entity_type: &str) -> LatheResult<AttributeMap> {
        self.construct(entity_type).plan()
    }

    /// Builds and saves `count` objects.
    pub fn make_many(&self, entity_type: &str, count: usize) -> LatheResult<Vec<Entity>> {
        self.construct(entity_type).make_many(count)
    }

    pub(crate) fn make_in(
        &self,
        context: &mut ConstructionContext,
        request: &Request,
    ) -> LatheResult<Entity> {
        let mut nested = context.enter(self.config.max_depth)?;
        debug!(
            "Making {} {} via {} adapter (depth {}, unsaved: {})",
            request.entity_type,
            request.blueprint,
            self.adapter.name(),
            nested.depth(),
            nested.is_persist_suppressed()
        );
        let mut object = Lathe::run(self, &mut nested, request)?.into_object();
        if !nested.is_persist_suppressed() {
            self.save(&mut object)?;
        }
        Ok(object)
    }

    pub(crate) fn plan_in(
        &self,
        context: &mut ConstructionContext,
        request: &Request,
    ) -> LatheResult<AttributeMap> {
        let mut nested = context.enter(self.config.max_depth)?;
        debug!(
            "Planning {} {} via {} adapter",
            request.entity_type,
            request.blueprint,
            self.adapter.name()
        );
        let lathe = Lathe::run(self, &mut nested, request)?;
        Ok(self.adapter.assigned_attributes_without_associations(&lathe))
    }

    fn save(&self, object: &mut Entity) -> LatheResult<()> {
        self.store.persist(object)?;
        if self.config.refresh_after_save
            && let Err(e) = self.store.refresh(object)
        {
            warn!(
                "Refresh after save failed for {} {}: {}",
                object.entity_type, object.id, e
            );
        }
        Ok(())
    }
}

/// A pending construction: type, blueprint name and overrides.
#[must_use]
pub struct Construction<'f> {
    factory: &'f Factory,
    request: Request,
}

impl Construction<'_> {
    /// Uses the named blueprint, layered over the type's default one.
    pub fn named(mut self, blueprint: &str) -> Self {
        self.request.blueprint = BlueprintName::named(blueprint);
        self
    }

    /// Overrides one attribute. The blueprint's definition for it never runs.
    pub fn with(mut self, attribute: &str, value: impl Into<AttributeValue>) -> Self {
        self.request.overrides.insert(attribute, value);
        self
    }

    /// Overrides several attributes.
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        for (name, value) in attributes {
            self.request.overrides.insert(name, value);
        }
        self
    }

    /// Builds and saves the object.
    pub fn make(self) -> LatheResult<Entity> {
        self.make_then(|_| Ok(()))
    }

    /// Builds and saves the object, then hands it to `then` before returning.
    pub fn make_then<F>(self, then: F) -> LatheResult<Entity>
    where
        F: FnOnce(&mut Entity) -> LatheResult<()>,
    {
        let mut context = ConstructionContext::new();
        let mut object = self.factory.make_in(&mut context, &self.request)?;
        then(&mut object)?;
        Ok(object)
    }

    /// Builds the object with persistence suppressed for it and everything
    /// it builds.
    pub fn make_unsaved(self) -> LatheResult<Entity> {
        self.make_unsaved_then(|_| Ok(()))
    }

    /// Like [`make_unsaved`](Self::make_unsaved); `then` runs after
    /// suppression ends, so objects it makes are saved normally.
    pub fn make_unsaved_then<F>(self, then: F) -> LatheResult<Entity>
    where
        F: FnOnce(&mut Entity) -> LatheResult<()>,
    {
        let mut context = ConstructionContext::new();
        let mut object = {
            let mut suppressed = context.suppress_persistence();
            self.factory.make_in(&mut suppressed, &self.request)?
        };
        then(&mut object)?;
        Ok(object)
    }

    /// The flattened attribute mapping; the object itself is never saved.
    pub fn plan(self) -> LatheResult<AttributeMap> {
        let mut context = ConstructionContext::new();
        self.factory.plan_in(&mut context, &self.request)
    }

    /// Builds and saves `count` objects from the same request.
    pub fn make_many(self, count: usize) -> LatheResult<Vec<Entity>> {
        (0..count)
            .map(|_| {
                let mut context = ConstructionContext::new();
                self.factory.make_in(&mut context, &self.request)
            })
            .collect()
    }
}

//! Blueprints and the per-type blueprint registry.

use crate::error::{LatheError, LatheResult};
use crate::generator;
use crate::lathe::Scope;
use lathe_model::{AttributeValue, SchemaCatalog};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Which of a type's blueprints to use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlueprintName {
    #[default]
    Default,
    Named(String),
}

impl BlueprintName {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for BlueprintName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("(default)"),
            Self::Named(name) => write!(f, ":{name}"),
        }
    }
}

impl From<&str> for BlueprintName {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for BlueprintName {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Deferred attribute computation.
pub type ProducerFn = dyn Fn(&mut Scope<'_>) -> LatheResult<AttributeValue> + Send + Sync;

/// How one attribute of a blueprint gets its value.
#[derive(Clone)]
pub enum Definition {
    /// Run a producer against the partially built object.
    Compute(Arc<ProducerFn>),
    /// Assign a constant.
    Literal(AttributeValue),
    /// Build the related object with its default blueprint when the attribute
    /// is an association, otherwise draw from the generator of the same name.
    Reference,
    /// Build the related object with the named blueprint.
    Association(String),
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute(_) => f.write_str("Compute(..)"),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Reference => f.write_str("Reference"),
            Self::Association(name) => f.debug_tuple("Association").field(name).finish(),
        }
    }
}

/// An ordered list of attribute definitions.
#[derive(Debug, Clone, Default)]
pub struct Blueprint {
    entries: Vec<(String, Definition)>,
}

impl Blueprint {
    /// Builds a blueprint through a [`BlueprintBuilder`].
    pub fn build(f: impl FnOnce(&mut BlueprintBuilder)) -> Self {
        let mut builder = BlueprintBuilder::default();
        f(&mut builder);
        builder.finish()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.entries.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collects attribute definitions in declaration order.
///
/// Declaring the same attribute twice keeps its first position and the last
/// definition.
#[derive(Default)]
pub struct BlueprintBuilder {
    entries: Vec<(String, Definition)>,
}

impl BlueprintBuilder {
    fn define(&mut self, name: &str, definition: Definition) -> &mut Self {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = definition,
            None => self.entries.push((name.to_string(), definition)),
        }
        self
    }

    /// `name { ... }`: computes the value when the blueprint runs.
    pub fn attribute<F, V>(&mut self, name: &str, producer: F) -> &mut Self
    where
        F: Fn(&mut Scope<'_>) -> LatheResult<V> + Send + Sync + 'static,
        V: Into<AttributeValue>,
    {
        let producer: Arc<ProducerFn> =
            Arc::new(move |scope: &mut Scope<'_>| producer(scope).map(Into::into));
        self.define(name, Definition::Compute(producer))
    }

    /// `name value`: assigns a constant.
    pub fn value(&mut self, name: &str, value: impl Into<AttributeValue>) -> &mut Self {
        self.define(name, Definition::Literal(value.into()))
    }

    /// Bare `name`: an associated object, or the generator called `name`.
    pub fn reference(&mut self, name: &str) -> &mut Self {
        self.define(name, Definition::Reference)
    }

    /// `name(:blueprint)`: an associated object built from a named blueprint.
    pub fn association(&mut self, name: &str, blueprint: &str) -> &mut Self {
        self.define(name, Definition::Association(blueprint.to_string()))
    }

    /// Draws from the generator `generator`, installing `template` as a
    /// [`sequence`](generator::sequence) on first use.
    pub fn sequence(&mut self, name: &str, generator: &str, template: &str) -> &mut Self {
        let source = generator.to_string();
        let template = template.to_string();
        self.attribute(name, move |scope: &mut Scope<'_>| {
            scope.next(&source, generator::sequence(&template))
        })
    }

    pub fn finish(self) -> Blueprint {
        Blueprint {
            entries: self.entries,
        }
    }
}

type TypeBlueprints = HashMap<BlueprintName, Arc<Blueprint>>;

/// Blueprints keyed by (entity type, blueprint name).
#[derive(Default)]
pub struct BlueprintRegistry {
    blueprints: RwLock<HashMap<String, TypeBlueprints>>,
}

impl BlueprintRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a blueprint, replacing any previous one with the same name.
    pub fn register(
        &self,
        entity_type: &str,
        name: BlueprintName,
        blueprint: Blueprint,
    ) -> LatheResult<()> {
        self.blueprints
            .write()
            .map_err(|_| LatheError::LockPoisoned)?
            .entry(entity_type.to_string())
            .or_default()
            .insert(name, Arc::new(blueprint));
        Ok(())
    }

    /// Removes every blueprint registered directly on the type. Ancestors
    /// keep theirs.
    pub fn clear_all(&self, entity_type: &str) -> LatheResult<()> {
        self.blueprints
            .write()
            .map_err(|_| LatheError::LockPoisoned)?
            .remove(entity_type);
        Ok(())
    }

    /// The blueprint registered directly on the type, without inheritance.
    pub fn get(&self, entity_type: &str, name: &BlueprintName) -> Option<Arc<Blueprint>> {
        self.blueprints
            .read()
            .ok()?
            .get(entity_type)?
            .get(name)
            .cloned()
    }

    /// The blueprint for the type, falling back to the nearest ancestor that
    /// has one with the same name.
    pub fn lookup(
        &self,
        catalog: &SchemaCatalog,
        entity_type: &str,
        name: &BlueprintName,
    ) -> LatheResult<Arc<Blueprint>> {
        self.find(catalog, entity_type, name)
            .ok_or_else(|| LatheError::NoBlueprintFound {
                entity_type: entity_type.to_string(),
                blueprint: name.clone(),
            })
    }

    fn find(
        &self,
        catalog: &SchemaCatalog,
        entity_type: &str,
        name: &BlueprintName,
    ) -> Option<Arc<Blueprint>> {
        let chain: Vec<String> = match catalog.ancestors(entity_type) {
            Ok(chain) => chain.iter().map(|s| s.entity_type.clone()).collect(),
            Err(_) => vec![entity_type.to_string()],
        };
        chain.iter().find_map(|t| self.get(t, name))
    }

    /// Blueprints to evaluate, in order, for a construction.
    ///
    /// The default blueprint alone, or the named blueprint followed by the
    /// default one when the type has it.
    pub fn layers(
        &self,
        catalog: &SchemaCatalog,
        entity_type: &str,
        name: &BlueprintName,
    ) -> LatheResult<Vec<Arc<Blueprint>>> {
        let primary = self.lookup(catalog, entity_type, name)?;
        let mut layers = vec![primary];
        if !name.is_default()
            && let Some(default) = self.find(catalog, entity_type, &BlueprintName::Default)
        {
            layers.push(default);
        }
        Ok(layers)
    }

    pub fn has_blueprint(
        &self,
        catalog: &SchemaCatalog,
        entity_type: &str,
        name: &BlueprintName,
    ) -> bool {
        self.find(catalog, entity_type, name).is_some()
    }

    /// Names registered directly on the type.
    pub fn names(&self, entity_type: &str) -> Vec<BlueprintName> {
        self.blueprints
            .read()
            .map(|all| {
                all.get(entity_type)
                    .map(|named| named.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }
}

//! The lathe: applies blueprints to one fresh object.
//!
//! Evaluation is a single pass over the blueprint layers in declaration
//! order. Each attribute is assigned at most once:
//!
//! 1. an attribute already assigned (by an earlier layer) is skipped;
//! 2. an overridden attribute takes the caller's value and its definition
//!    never runs, so it advances no generator and builds no related object;
//! 3. anything else runs its definition and assigns the result.
//!
//! Overrides for attributes no blueprint mentions are assigned last.

use crate::blueprint::{Blueprint, BlueprintName, Definition};
use crate::context::ConstructionContext;
use crate::error::{LatheError, LatheResult};
use crate::factory::{Factory, Request};
use lathe_model::{AttributeMap, AttributeValue, Entity};
use std::sync::Arc;
use tracing::{debug, trace};

/// Transient evaluator owning the object under construction.
#[derive(Debug)]
pub struct Lathe {
    object: Entity,
    assigned: Vec<String>,
    overrides: AttributeMap,
}

impl Lathe {
    /// Binds a blank object and the caller's overrides.
    pub fn new(object: Entity, overrides: AttributeMap) -> Self {
        Self {
            object,
            assigned: Vec::new(),
            overrides,
        }
    }

    /// Builds the object for `request` with the factory's blueprints.
    pub(crate) fn run(
        factory: &Factory,
        context: &mut ConstructionContext,
        request: &Request,
    ) -> LatheResult<Self> {
        let object = factory.catalog().blank(&request.entity_type)?;
        let layers = factory.blueprints().layers(
            factory.catalog(),
            &request.entity_type,
            &request.blueprint,
        )?;
        let mut lathe = Self::new(object, request.overrides.clone());
        lathe.evaluate(factory, context, &layers)?;
        Ok(lathe)
    }

    fn evaluate(
        &mut self,
        factory: &Factory,
        context: &mut ConstructionContext,
        layers: &[Arc<Blueprint>],
    ) -> LatheResult<()> {
        for blueprint in layers {
            for (name, definition) in blueprint.entries() {
                if self.is_assigned(name) {
                    continue;
                }
                if let Some(value) = self.overrides.remove(name) {
                    trace!("Override wins for {}.{}", self.object.entity_type, name);
                    self.assign(name, value);
                    continue;
                }
                let value = self.generate(factory, context, name, definition)?;
                self.assign(name, value);
            }
        }
        for (name, value) in std::mem::take(&mut self.overrides) {
            if !self.is_assigned(&name) {
                self.assign(&name, value);
            }
        }
        Ok(())
    }

    fn generate(
        &self,
        factory: &Factory,
        context: &mut ConstructionContext,
        name: &str,
        definition: &Definition,
    ) -> LatheResult<AttributeValue> {
        match definition {
            Definition::Literal(value) => Ok(value.clone()),
            Definition::Compute(producer) => {
                let mut scope = Scope {
                    factory,
                    context,
                    lathe: self,
                    attribute: name,
                };
                producer(&mut scope)
            }
            Definition::Reference => {
                if factory.adapter().has_association(&self.object, name) {
                    self.build_related(factory, context, name, BlueprintName::Default)
                } else {
                    Ok(factory.generators().next_defined(name)?.into())
                }
            }
            Definition::Association(blueprint) => {
                self.build_related(factory, context, name, BlueprintName::named(blueprint))
            }
        }
    }

    fn build_related(
        &self,
        factory: &Factory,
        context: &mut ConstructionContext,
        name: &str,
        blueprint: BlueprintName,
    ) -> LatheResult<AttributeValue> {
        let related_type = factory
            .adapter()
            .class_for_association(&self.object, name)
            .ok_or_else(|| LatheError::UnknownAssociation {
                entity_type: self.object.entity_type.clone(),
                attribute: name.to_string(),
            })?;
        debug!(
            "Building {} {} for {}.{}",
            related_type, blueprint, self.object.entity_type, name
        );
        let request = Request::new(related_type).blueprint(blueprint);
        Ok(factory.make_in(context, &request)?.into())
    }

    /// Assigns an attribute and records it as explicitly assigned.
    pub fn assign(&mut self, name: &str, value: AttributeValue) {
        self.object.assign(name, value);
        if !self.is_assigned(name) {
            self.assigned.push(name.to_string());
        }
    }

    /// True once evaluation has assigned the attribute.
    pub fn is_assigned(&self, name: &str) -> bool {
        self.assigned.iter().any(|n| n == name)
    }

    /// The object under construction.
    pub fn object(&self) -> &Entity {
        &self.object
    }

    pub fn into_object(self) -> Entity {
        self.object
    }

    /// Explicitly assigned attributes, in assignment order. Schema defaults
    /// are not included.
    pub fn assigned_attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.assigned
            .iter()
            .filter_map(|name| self.object.get(name).map(|value| (name.as_str(), value)))
    }

    pub fn assigned_names(&self) -> &[String] {
        &self.assigned
    }
}

/// What a blueprint producer sees while it runs.
///
/// Attributes assigned earlier in the pass are readable; later ones are not.
/// Nested constructions started here inherit the enclosing construction's
/// context, so they stay unsaved inside `make_unsaved`.
pub struct Scope<'a> {
    factory: &'a Factory,
    context: &'a mut ConstructionContext,
    lathe: &'a Lathe,
    attribute: &'a str,
}

impl Scope<'_> {
    /// The attribute being computed.
    pub fn attribute(&self) -> &str {
        self.attribute
    }

    /// Concrete type of the object under construction.
    pub fn entity_type(&self) -> &str {
        &self.lathe.object.entity_type
    }

    /// An attribute assigned earlier in this pass.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        if self.lathe.is_assigned(name) {
            self.lathe.object.get(name)
        } else {
            None
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.get(name).and_then(AttributeValue::as_entity)
    }

    pub fn is_persist_suppressed(&self) -> bool {
        self.context.is_persist_suppressed()
    }

    /// Next unique value from the factory's generator registry.
    pub fn next<F>(&mut self, generator: &str, producer: F) -> LatheResult<serde_json::Value>
    where
        F: Fn(u64) -> serde_json::Value + Send + Sync + 'static,
    {
        self.factory.generators().next(generator, producer)
    }

    /// Next value from a generator defined ahead of time.
    pub fn sham(&mut self, generator: &str) -> LatheResult<serde_json::Value> {
        self.factory.generators().next_defined(generator)
    }

    /// Builds another object with its default blueprint.
    pub fn make(&mut self, entity_type: &str) -> LatheResult<Entity> {
        self.factory.make_in(self.context, &Request::new(entity_type))
    }

    /// Builds another object with a named blueprint.
    pub fn make_named(&mut self, entity_type: &str, blueprint: &str) -> LatheResult<Entity> {
        let request = Request::new(entity_type).blueprint(BlueprintName::named(blueprint));
        self.factory.make_in(self.context, &request)
    }

    /// Builds another object without saving it, whatever the context says.
    pub fn make_unsaved(&mut self, entity_type: &str) -> LatheResult<Entity> {
        let mut suppressed = self.context.suppress_persistence();
        self.factory.make_in(&mut suppressed, &Request::new(entity_type))
    }

    /// Plans another object.
    pub fn plan(&mut self, entity_type: &str) -> LatheResult<AttributeMap> {
        self.factory.plan_in(self.context, &Request::new(entity_type))
    }

    /// Error to return from a producer that cannot compute its value.
    pub fn fail(&self, message: impl Into<String>) -> LatheError {
        LatheError::Producer {
            attribute: self.attribute.to_string(),
            message: message.into(),
        }
    }
}

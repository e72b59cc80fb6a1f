use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

/// Describes an entity type: its parent in the type hierarchy, its declared
/// fields and its associations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    /// Supertype for single-table inheritance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub associations: Vec<Association>,
}

impl EntitySchema {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            parent: None,
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Declares the supertype this type inherits from.
    #[must_use]
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Shorthand for a belongs-to association.
    #[must_use]
    pub fn belongs_to(self, name: &str) -> Self {
        self.association(Association::belongs_to(name))
    }

    /// Shorthand for a has-many association.
    #[must_use]
    pub fn has_many(self, name: &str) -> Self {
        self.association(Association::has_many(name))
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn find_association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Value a blank instance starts with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FieldDef {
    fn simple(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: None,
        }
    }

    /// Shorthand for a text field.
    pub fn text(name: &str) -> Self {
        Self::simple(name, FieldType::Text)
    }

    /// Shorthand for a numeric field.
    pub fn number(name: &str) -> Self {
        Self::simple(name, FieldType::Number)
    }

    /// Shorthand for a boolean field.
    pub fn bool(name: &str) -> Self {
        Self::simple(name, FieldType::Bool)
    }

    /// Shorthand for a DateTime field.
    pub fn datetime(name: &str) -> Self {
        Self::simple(name, FieldType::DateTime)
    }

    /// Shorthand for a key field (ids and foreign keys).
    pub fn key(name: &str) -> Self {
        Self::simple(name, FieldType::Key)
    }

    /// Shorthand for a JSON blob field.
    pub fn json(name: &str) -> Self {
        Self::simple(name, FieldType::Json)
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// The data type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Bool,
    DateTime,
    Key,
    Json,
}

/// How an association attribute relates its owner to the related type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// The owner stores the related entity's id in a foreign-key attribute.
    BelongsTo,
    HasOne,
    HasMany,
    /// Related documents nested inside the owner's document.
    Embedded,
}

/// Association metadata for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    pub name: String,
    pub kind: AssociationKind,
    /// Related type, when it differs from the one derived from `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Foreign-key attribute, when it differs from `<name>_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

impl Association {
    fn simple(name: &str, kind: AssociationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            class_name: None,
            foreign_key: None,
        }
    }

    pub fn belongs_to(name: &str) -> Self {
        Self::simple(name, AssociationKind::BelongsTo)
    }

    pub fn has_one(name: &str) -> Self {
        Self::simple(name, AssociationKind::HasOne)
    }

    pub fn has_many(name: &str) -> Self {
        Self::simple(name, AssociationKind::HasMany)
    }

    pub fn embedded(name: &str) -> Self {
        Self::simple(name, AssociationKind::Embedded)
    }

    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn with_foreign_key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    pub fn is_belongs_to(&self) -> bool {
        self.kind == AssociationKind::BelongsTo
    }

    /// The related type: `class_name`, or `name` in PascalCase with a
    /// plural `s` dropped for collection associations.
    pub fn related_type(&self) -> String {
        if let Some(class_name) = &self.class_name {
            return class_name.clone();
        }
        let base = match self.kind {
            AssociationKind::HasMany | AssociationKind::Embedded => {
                self.name.strip_suffix('s').unwrap_or(&self.name)
            }
            AssociationKind::BelongsTo | AssociationKind::HasOne => &self.name,
        };
        base.to_case(Case::Pascal)
    }

    /// The attribute holding the related id.
    pub fn foreign_key(&self) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}_id", self.name))
    }
}

//! Entity descriptors.
//!
//! Every business table in the CRM has the same shape: a surrogate `id`, a
//! fixed list of typed columns, and an ordering used when listing. An
//! [`EntitySchema`] captures that shape once so a single controller can serve
//! all of them.

pub mod catalog;
pub mod ddl;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::FilterOrderInfo;

pub use catalog::Catalog;
pub use validate::{ValidationErrors, WriteMode};

/// One stored row, keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// ISO-8601 date or datetime, kept exactly as submitted.
    Timestamp,
    /// JSON object or array persisted in a text column.
    Json,
    /// JSON array persisted in a text column.
    List,
}

impl FieldType {
    /// Whether the value is serialized to text on write and parsed on read.
    pub fn is_serialized(&self) -> bool {
        matches!(self, FieldType::Json | FieldType::List)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDefault {
    /// Current UTC time, formatted like `2024-05-01T10:30:00.000Z`.
    Now,
    Value(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoField {
    /// Stamped by the server on create; never written by clients or by replace.
    Created,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<FieldDefault>,
    #[serde(default)]
    pub auto: Option<AutoField>,
}

impl FieldDef {
    pub fn new(name: &str, ty: FieldType) -> Self {
        Self { name: name.to_string(), ty, required: false, default: None, auto: None }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FieldType::Text)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn decimal(name: &str) -> Self {
        Self::new(name, FieldType::Decimal)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn timestamp(name: &str) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    pub fn json(name: &str) -> Self {
        Self::new(name, FieldType::Json)
    }

    pub fn list(name: &str) -> Self {
        Self::new(name, FieldType::List)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_now(mut self) -> Self {
        self.default = Some(FieldDefault::Now);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Value(value));
        self
    }

    pub fn created(mut self) -> Self {
        self.auto = Some(AutoField::Created);
        self
    }

    /// Clients may supply this column.
    pub fn is_writable(&self) -> bool {
        self.auto.is_none()
    }
}

/// A file stored next to the record; its relative path lands in `field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSpec {
    pub field: String,
    pub subdir: String,
}

/// Read-only column pulled from another table through a foreign key,
/// with left-join semantics: dangling references read as null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookup {
    pub field: String,
    pub table: String,
    pub column: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Route segment, e.g. `project-assignments`.
    pub name: String,
    pub table: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub order: Vec<FilterOrderInfo>,
    #[serde(default)]
    pub attachment: Option<AttachmentSpec>,
    #[serde(default)]
    pub lookups: Vec<Lookup>,
}

impl EntitySchema {
    pub fn new(name: &str, table: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            fields,
            order: Vec::new(),
            attachment: None,
            lookups: Vec::new(),
        }
    }

    pub fn order_by(mut self, order: FilterOrderInfo) -> Self {
        self.order = vec![order];
        self
    }

    pub fn with_attachment(mut self, field: &str, subdir: &str) -> Self {
        self.attachment = Some(AttachmentSpec { field: field.to_string(), subdir: subdir.to_string() });
        self
    }

    pub fn with_lookup(mut self, field: &str, table: &str, column: &str, alias: &str) -> Self {
        self.lookups.push(Lookup {
            field: field.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            alias: alias.to_string(),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.is_writable())
    }
}

/// Many-to-many link between two entities, e.g. campaigns and personas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Route segment of the owning side (`campaigns` in `/campaigns/:id/personas`).
    pub owner_path: String,
    /// Entity name of the owning side.
    pub owner: String,
    pub owner_column: String,
    /// Route segment of the member side (`personas`).
    pub member_path: String,
    /// Entity name of the member side.
    pub member: String,
    pub member_column: String,
    pub table: String,
    /// Request body key carrying the member ids.
    pub body_key: String,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Invalid route name '{0}'")]
    InvalidRouteName(String),

    #[error("Route name '{0}' is reserved")]
    ReservedRouteName(String),

    #[error("Duplicate entity '{0}'")]
    DuplicateEntity(String),

    #[error("Entity '{entity}' has a duplicate field '{field}'")]
    DuplicateField { entity: String, field: String },

    #[error("Entity '{entity}' references unknown field '{field}'")]
    UnknownField { entity: String, field: String },

    #[error("Entity '{entity}' looks up unknown column '{target}'")]
    UnknownLookupTarget { entity: String, target: String },

    #[error("Association '{0}' references an unknown entity")]
    UnknownAssociationEntity(String),

    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse schema file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_flags() {
        let f = FieldDef::timestamp("created_at").created();
        assert!(!f.is_writable());
        let g = FieldDef::text("status").required().default_value(Value::from("new"));
        assert!(g.required);
        assert_eq!(g.default, Some(FieldDefault::Value(Value::from("new"))));
    }

    #[test]
    fn field_type_deserializes_lowercase() {
        let def: FieldDef = serde_yaml::from_str("name: tags\ntype: list\ndefault: !value []\n").unwrap();
        assert_eq!(def.ty, FieldType::List);
        assert!(def.ty.is_serialized());
        assert_eq!(def.default, Some(FieldDefault::Value(Value::Array(vec![]))));
    }
}

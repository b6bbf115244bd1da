//! Descriptor model
//!
//! Metadata records describing tables and views, sourced from the database
//! catalog. Descriptors are owned by the metadata cache and replaced
//! wholesale on every refresh; anything holding one across a refresh is
//! holding a snapshot, not a live object (see `resolver`).

use crate::error::GridError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A row as the grid sees it: column name to value. Identity within the grid
/// is positional index, not a stable key.
pub type GridRow = HashMap<String, Value>;

/// Table metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub id: u32,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

fn default_schema() -> String {
    "public".to_string()
}

impl TableDescriptor {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// First column whose name matches exactly (case-sensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// View metadata record. Views carry no column metadata and render read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDescriptor {
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default, rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
}

/// Target of a single-column foreign key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRef {
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
}

/// Foreign-key edge between two tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub constraint_name: String,
    pub source_schema: String,
    pub source_table: String,
    pub source_column: String,
    pub target_schema: String,
    pub target_table: String,
    pub target_column: String,
}

/// Classification of a raw metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Table,
    View,
}

/// The entity currently bound to the grid. The discriminant is explicit:
/// callers say what they selected instead of the grid guessing from the
/// record's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Table(TableDescriptor),
    View(ViewDescriptor),
}

impl Entity {
    pub fn id(&self) -> u32 {
        match self {
            Entity::Table(t) => t.id,
            Entity::View(v) => v.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Table(t) => &t.name,
            Entity::View(v) => &v.name,
        }
    }

    pub fn schema(&self) -> Option<&str> {
        match self {
            Entity::Table(t) => Some(&t.schema),
            Entity::View(v) => v.schema.as_deref(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Table(_) => EntityKind::Table,
            Entity::View(_) => EntityKind::View,
        }
    }

    /// Classify an untyped wire record by its populated attributes: exactly
    /// `{id, name}` is a view, anything wider (an empty `columns` array
    /// counts) is a table. Used only at the ingestion boundary; everything
    /// past it carries the explicit tag.
    pub fn classify_record(record: &Value) -> Result<EntityKind, GridError> {
        let map = record
            .as_object()
            .ok_or_else(|| GridError::UnsupportedEntity("record is not an object".to_string()))?;

        let has_id = map.get("id").is_some_and(|v| !v.is_null());
        let has_name = map.get("name").is_some_and(|v| !v.is_null());
        if !has_id || !has_name {
            return Err(GridError::UnsupportedEntity(
                "record is missing id or name".to_string(),
            ));
        }

        let populated = map.values().filter(|v| !v.is_null()).count();
        if populated == 2 {
            Ok(EntityKind::View)
        } else {
            Ok(EntityKind::Table)
        }
    }

    /// Classify and deserialize an untyped record into a tagged entity.
    pub fn from_record(record: Value) -> Result<Entity, GridError> {
        let kind = Self::classify_record(&record)?;
        let entity = match kind {
            EntityKind::View => serde_json::from_value(record).map(Entity::View),
            EntityKind::Table => serde_json::from_value(record).map(Entity::Table),
        };
        entity.map_err(|e| GridError::UnsupportedEntity(e.to_string()))
    }
}

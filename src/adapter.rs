//! Table Descriptor Adapter
//!
//! Pure transform from a tagged entity into the schema the grid consumes.
//! Tables get ordered column definitions, the primary-key set, and a
//! relationship map keyed by source column. Views get a display name only
//! and render read-only with no column introspection.

use crate::descriptor::{Column, Entity, Relationship};
use serde::Serialize;
use std::collections::HashMap;

/// Grid-consumable schema derived from a descriptor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSchema {
    pub display_name: String,
    pub editable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<u32>,
    pub columns: Vec<Column>,
    pub primary_keys: Vec<String>,
    pub relationships: HashMap<String, Relationship>,
}

impl GridSchema {
    pub fn from_entity(entity: &Entity) -> Self {
        match entity {
            Entity::Table(table) => {
                let relationships = table
                    .relationships
                    .iter()
                    .map(|r| (r.source_column.clone(), r.clone()))
                    .collect();
                Self {
                    display_name: table.qualified_name(),
                    // Only tables in the public schema are editable.
                    editable: table.schema == "public",
                    table_id: Some(table.id),
                    columns: table.columns.clone(),
                    primary_keys: table.primary_keys.clone(),
                    relationships,
                }
            }
            Entity::View(view) => Self {
                display_name: view.name.clone(),
                editable: false,
                table_id: None,
                columns: Vec::new(),
                primary_keys: Vec::new(),
                relationships: HashMap::new(),
            },
        }
    }
}

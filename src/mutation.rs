//! Mutation request DTOs
//!
//! Validated payloads committed by the column and table editor panels,
//! plus the DDL they generate.

use crate::error::GridError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Valid PostgreSQL data types accepted from the column editor
pub const VALID_DATA_TYPES: &[&str] = &[
    "smallint", "integer", "bigint", "decimal", "numeric", "real", "double precision",
    "smallserial", "serial", "bigserial",
    "character", "char", "character varying", "varchar", "text",
    "bytea",
    "timestamp", "timestamp with time zone", "timestamp without time zone",
    "date", "time", "time with time zone", "time without time zone", "interval",
    "boolean", "bool",
    "uuid",
    "json", "jsonb",
    "inet", "cidr", "macaddr",
    "int", "int2", "int4", "int8", "float4", "float8",
];

/// Column definition committed by the column editor panel
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    #[validate(length(min = 1, max = 63, message = "Column name must be between 1 and 63 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Column type is required"))]
    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub nullable: Option<bool>,

    #[serde(default)]
    pub primary_key: Option<bool>,

    #[serde(default)]
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    /// Check the declared type against the whitelist; array types pass.
    pub fn validate_data_type(&self) -> Result<(), GridError> {
        let normalized = self.data_type.to_lowercase();
        let base_type = normalized.split('(').next().unwrap_or(&normalized).trim();

        let is_valid = VALID_DATA_TYPES
            .iter()
            .any(|t| base_type == *t || base_type.starts_with(t))
            || base_type.ends_with("[]");

        if is_valid {
            Ok(())
        } else {
            Err(GridError::Validation(format!(
                "Invalid data type: {}",
                self.data_type
            )))
        }
    }

    /// SQL fragment for this column inside CREATE TABLE / ADD COLUMN
    pub fn to_sql(&self) -> String {
        let mut parts = vec![format!("\"{}\" {}", self.name, self.data_type)];

        if let Some(false) = self.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(true) = self.primary_key {
            parts.push("PRIMARY KEY".to_string());
        }
        if let Some(ref default) = self.default_value {
            parts.push(format!("DEFAULT {}", default));
        }

        parts.join(" ")
    }
}

/// Payload committed by the table editor panel
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    #[validate(length(min = 1, max = 63, message = "Table name must be between 1 and 63 characters"))]
    pub table_name: String,

    #[validate(length(min = 1, message = "At least one column is required"))]
    #[validate(nested)]
    pub columns: Vec<ColumnDefinition>,
}

impl CreateTableRequest {
    /// Full CREATE TABLE statement for the given schema
    pub fn to_sql(&self, schema: &str) -> String {
        let cols: Vec<String> = self.columns.iter().map(|c| c.to_sql()).collect();
        format!(
            "CREATE TABLE \"{}\".\"{}\" (\n  {}\n);",
            schema,
            self.table_name,
            cols.join(",\n  ")
        )
    }
}

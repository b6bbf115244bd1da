//! Postgres catalog provider
//!
//! Backs the metadata cache with a live database: introspects tables and
//! views into descriptors, refreshes the cache wholesale, executes the
//! grid's pass-through queries, and runs the DDL behind the table and
//! column editor panels. Every DDL operation re-introspects afterwards,
//! which is exactly the refresh that invalidates held descriptors (see
//! `resolver`).

use crate::descriptor::{
    Column, ForeignKeyRef, GridRow, Relationship, TableDescriptor, ViewDescriptor,
};
use crate::error::GridError;
use crate::mutation::{ColumnDefinition, CreateTableRequest};
use crate::store::{MetadataCache, QueryExecutor};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Client, Pool};
use serde_json::Value;
use std::sync::Arc;
use tokio_postgres::types::Type;
use tokio_postgres::Row;
use tracing::{debug, info};
use validator::Validate;

pub struct PgCatalog {
    pool: Pool,
    cache: Arc<MetadataCache>,
}

impl PgCatalog {
    pub fn new(pool: Pool, cache: Arc<MetadataCache>) -> Self {
        Self { pool, cache }
    }

    pub fn cache(&self) -> Arc<MetadataCache> {
        self.cache.clone()
    }

    /// Re-introspect and replace the cached snapshot wholesale.
    pub async fn refresh(&self) -> Result<u64, GridError> {
        let (tables, views) = self.introspect().await?;
        Ok(self.cache.replace(tables, views).await)
    }

    /// Read the current catalog state from the database.
    pub async fn introspect(
        &self,
    ) -> Result<(Vec<TableDescriptor>, Vec<ViewDescriptor>), GridError> {
        let client = self.pool.get().await?;

        let relationships = Self::get_relationships(&client).await?;
        let tables = Self::get_tables(&client, &relationships).await?;
        let views = Self::get_views(&client).await?;

        debug!(
            tables = tables.len(),
            views = views.len(),
            relationships = relationships.len(),
            "introspected catalog"
        );
        Ok((tables, views))
    }

    /// Run the CREATE TABLE committed by the table editor panel, refresh,
    /// and return the new descriptor (callers navigate to its id).
    pub async fn create_table(
        &self,
        schema: &str,
        request: &CreateTableRequest,
    ) -> Result<TableDescriptor, GridError> {
        request
            .validate()
            .map_err(|e| GridError::Validation(e.to_string()))?;
        for column in &request.columns {
            column.validate_data_type()?;
        }

        let client = self.pool.get().await?;
        client.batch_execute(&request.to_sql(schema)).await?;
        info!(schema, table = %request.table_name, "created table");

        self.refresh().await?;
        let snapshot = self.cache.snapshot().await;
        snapshot
            .find_table_by_name(schema, &request.table_name)
            .cloned()
            .ok_or_else(|| {
                GridError::Internal(format!(
                    "table {}.{} missing after refresh",
                    schema, request.table_name
                ))
            })
    }

    /// Run the ADD COLUMN committed by the column editor panel, then refresh.
    pub async fn add_column(
        &self,
        schema: &str,
        table: &str,
        column: &ColumnDefinition,
    ) -> Result<(), GridError> {
        column
            .validate()
            .map_err(|e| GridError::Validation(e.to_string()))?;
        column.validate_data_type()?;

        let client = self.pool.get().await?;
        client
            .batch_execute(&add_column_sql(schema, table, column))
            .await?;
        info!(schema, table, column = %column.name, "added column");

        self.refresh().await?;
        Ok(())
    }

    async fn get_tables(
        client: &Client,
        relationships: &[Relationship],
    ) -> Result<Vec<TableDescriptor>, GridError> {
        let table_query = r#"
            SELECT c.oid, n.nspname AS table_schema, c.relname AS table_name
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind = 'r'
              AND n.nspname NOT IN ('pg_catalog', 'information_schema')
            ORDER BY n.nspname, c.relname
        "#;

        let table_rows = client.query(table_query, &[]).await?;
        let mut tables = Vec::new();

        for row in table_rows {
            let id: u32 = row.get("oid");
            let schema: String = row.get("table_schema");
            let name: String = row.get("table_name");

            let table_relationships: Vec<Relationship> = relationships
                .iter()
                .filter(|r| r.source_schema == schema && r.source_table == name)
                .cloned()
                .collect();

            let columns =
                Self::get_columns(client, &schema, &name, &table_relationships).await?;
            let primary_keys = Self::get_primary_keys(client, &schema, &name).await?;

            tables.push(TableDescriptor {
                id,
                schema,
                name,
                columns,
                primary_keys,
                relationships: table_relationships,
            });
        }

        Ok(tables)
    }

    async fn get_columns(
        client: &Client,
        schema: &str,
        table: &str,
        relationships: &[Relationship],
    ) -> Result<Vec<Column>, GridError> {
        let query = r#"
            SELECT c.column_name, c.data_type, c.is_nullable, c.column_default
            FROM information_schema.columns c
            WHERE c.table_schema = $1 AND c.table_name = $2
            ORDER BY c.ordinal_position
        "#;

        let rows = client.query(query, &[&schema, &table]).await?;

        let columns = rows
            .iter()
            .map(|row| {
                let name: String = row.get("column_name");
                let foreign_key = relationships
                    .iter()
                    .find(|r| r.source_column == name)
                    .map(|r| ForeignKeyRef {
                        target_schema: r.target_schema.clone(),
                        target_table: r.target_table.clone(),
                        target_column: r.target_column.clone(),
                    });
                Column {
                    name,
                    data_type: row.get("data_type"),
                    nullable: row.get::<_, String>("is_nullable") == "YES",
                    default_value: row.get("column_default"),
                    foreign_key,
                }
            })
            .collect();

        Ok(columns)
    }

    async fn get_primary_keys(
        client: &Client,
        schema: &str,
        table: &str,
    ) -> Result<Vec<String>, GridError> {
        let query = r#"
            SELECT COALESCE(
                array_agg(kcu.column_name::text ORDER BY kcu.ordinal_position),
                ARRAY[]::text[]
            ) AS columns
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_schema = $1
                AND tc.table_name = $2
        "#;

        let rows = client.query(query, &[&schema, &table]).await?;
        Ok(rows
            .first()
            .and_then(|row| row.try_get("columns").ok())
            .unwrap_or_default())
    }

    async fn get_relationships(client: &Client) -> Result<Vec<Relationship>, GridError> {
        let query = r#"
            SELECT
                tc.constraint_name,
                tc.table_schema AS source_schema,
                tc.table_name AS source_table,
                kcu.column_name AS source_column,
                ccu.table_schema AS target_schema,
                ccu.table_name AS target_table,
                ccu.column_name AS target_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
                ON tc.constraint_name = ccu.constraint_name
                AND tc.table_schema = ccu.constraint_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
                AND tc.table_schema NOT IN ('pg_catalog', 'information_schema')
            ORDER BY tc.table_schema, tc.table_name, tc.constraint_name
        "#;

        let rows = client.query(query, &[]).await?;

        Ok(rows
            .iter()
            .map(|row| Relationship {
                constraint_name: row.get("constraint_name"),
                source_schema: row.get("source_schema"),
                source_table: row.get("source_table"),
                source_column: row.get("source_column"),
                target_schema: row.get("target_schema"),
                target_table: row.get("target_table"),
                target_column: row.get("target_column"),
            })
            .collect())
    }

    async fn get_views(client: &Client) -> Result<Vec<ViewDescriptor>, GridError> {
        let query = r#"
            SELECT c.oid, n.nspname AS view_schema, c.relname AS view_name
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind IN ('v', 'm')
              AND n.nspname NOT IN ('pg_catalog', 'information_schema')
            ORDER BY n.nspname, c.relname
        "#;

        let rows = client.query(query, &[]).await?;

        Ok(rows
            .iter()
            .map(|row| ViewDescriptor {
                id: row.get("oid"),
                name: row.get("view_name"),
                schema: Some(row.get("view_schema")),
            })
            .collect())
    }
}

#[async_trait]
impl QueryExecutor for PgCatalog {
    async fn execute(&self, sql: &str) -> Result<Value, GridError> {
        let client = self.pool.get().await?;
        let rows = client.query(sql, &[]).await?;
        let data: Vec<Value> = rows
            .iter()
            .map(|row| Value::Object(row_to_json(row).into_iter().collect()))
            .collect();
        Ok(Value::Array(data))
    }
}

fn add_column_sql(schema: &str, table: &str, column: &ColumnDefinition) -> String {
    format!(
        "ALTER TABLE \"{}\".\"{}\" ADD COLUMN {};",
        schema,
        table,
        column.to_sql()
    )
}

/// Best-effort conversion of a result row to JSON; unrecognized types fall
/// back to their text representation, then to null.
fn row_to_json(row: &Row) -> GridRow {
    let mut out = GridRow::new();
    for (i, column) in row.columns().iter().enumerate() {
        let t = column.type_();
        let value = if *t == Type::BOOL {
            row.try_get::<_, Option<bool>>(i).ok().flatten().map(Value::from)
        } else if *t == Type::INT2 {
            row.try_get::<_, Option<i16>>(i).ok().flatten().map(Value::from)
        } else if *t == Type::INT4 {
            row.try_get::<_, Option<i32>>(i).ok().flatten().map(Value::from)
        } else if *t == Type::INT8 {
            row.try_get::<_, Option<i64>>(i).ok().flatten().map(Value::from)
        } else if *t == Type::OID {
            row.try_get::<_, Option<u32>>(i).ok().flatten().map(Value::from)
        } else if *t == Type::FLOAT4 {
            row.try_get::<_, Option<f32>>(i).ok().flatten().map(Value::from)
        } else if *t == Type::FLOAT8 {
            row.try_get::<_, Option<f64>>(i).ok().flatten().map(Value::from)
        } else if *t == Type::JSON || *t == Type::JSONB {
            row.try_get::<_, Option<Value>>(i).ok().flatten()
        } else if *t == Type::UUID {
            row.try_get::<_, Option<uuid::Uuid>>(i)
                .ok()
                .flatten()
                .map(|v| Value::String(v.to_string()))
        } else if *t == Type::TIMESTAMPTZ {
            row.try_get::<_, Option<DateTime<Utc>>>(i)
                .ok()
                .flatten()
                .map(|v| Value::String(v.to_rfc3339()))
        } else {
            row.try_get::<_, Option<String>>(i)
                .ok()
                .flatten()
                .map(Value::String)
        };
        out.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    out
}

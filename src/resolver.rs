//! Stale-Reference Resolver
//!
//! A table descriptor held by a caller may predate the cache's latest
//! snapshot: creation flows trigger an asynchronous refresh, and the cache
//! replaces descriptors wholesale. Any column edit or delete must therefore
//! re-resolve the column from the current snapshot by table id and column
//! name, never through the caller's held object.

use crate::descriptor::Column;
use crate::error::GridError;
use crate::store::MetadataCache;

/// Locate `column_name` in the current descriptor for `table_id`.
///
/// Reads the cache's current snapshot (a synchronous cache read, not a
/// network round trip), finds the table by id, then the column by
/// case-sensitive first-match name.
pub async fn resolve_column(
    cache: &MetadataCache,
    table_id: u32,
    column_name: &str,
) -> Result<Column, GridError> {
    let snapshot = cache.snapshot().await;
    let table = snapshot
        .find_table(table_id)
        .ok_or(GridError::TableNotFound(table_id))?;

    table
        .column(column_name)
        .cloned()
        .ok_or_else(|| GridError::ColumnNotFound {
            table: table.name.clone(),
            column: column_name.to_string(),
        })
}

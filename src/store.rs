//! Metadata Snapshot Cache
//!
//! Holds the current catalog snapshot: every refresh replaces the whole
//! snapshot and bumps its generation counter, never patching in place.
//! Readers always see a consistent generation; a descriptor cloned out of
//! one snapshot says nothing about the next.

use crate::descriptor::{TableDescriptor, ViewDescriptor};
use crate::error::GridError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Immutable catalog state at a point in time
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub generation: u64,
    pub captured_at: DateTime<Utc>,
    pub tables: Vec<TableDescriptor>,
    pub views: Vec<ViewDescriptor>,
    pub checksum: String,
}

impl CatalogSnapshot {
    pub fn empty() -> Self {
        Self {
            generation: 0,
            captured_at: Utc::now(),
            tables: Vec::new(),
            views: Vec::new(),
            checksum: Self::compute_checksum(&[], &[]),
        }
    }

    /// Compute checksum from catalog content, order-independent for tables
    pub fn compute_checksum(tables: &[TableDescriptor], views: &[ViewDescriptor]) -> String {
        let mut hasher = Sha256::new();

        let mut table_strs: Vec<String> = tables
            .iter()
            .map(|t| format!("{}#{}", t.id, t.qualified_name()))
            .collect();
        table_strs.sort();
        for t in &table_strs {
            hasher.update(t.as_bytes());
        }

        for table in tables {
            for col in &table.columns {
                hasher.update(
                    format!("{}.{}:{}", table.qualified_name(), col.name, col.data_type).as_bytes(),
                );
            }
        }

        let mut view_strs: Vec<String> = views.iter().map(|v| format!("{}#{}", v.id, v.name)).collect();
        view_strs.sort();
        for v in &view_strs {
            hasher.update(v.as_bytes());
        }

        format!("{:x}", hasher.finalize())
    }

    pub fn find_table(&self, id: u32) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn find_table_by_name(&self, schema: &str, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }
}

/// Cached view of the catalog, refreshed wholesale by a provider
pub struct MetadataCache {
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::empty())),
        }
    }

    /// Cheap read of the current snapshot (no copy of the table list)
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current.read().await.clone()
    }

    /// Current full table list, cloned out of the snapshot
    pub async fn list_tables(&self) -> Vec<TableDescriptor> {
        self.current.read().await.tables.clone()
    }

    pub async fn find_table(&self, id: u32) -> Option<TableDescriptor> {
        self.current.read().await.find_table(id).cloned()
    }

    pub async fn generation(&self) -> u64 {
        self.current.read().await.generation
    }

    /// Replace the entire snapshot and bump the generation counter.
    /// There is deliberately no partial-patch path.
    pub async fn replace(
        &self,
        tables: Vec<TableDescriptor>,
        views: Vec<ViewDescriptor>,
    ) -> u64 {
        let checksum = CatalogSnapshot::compute_checksum(&tables, &views);
        let mut current = self.current.write().await;
        let generation = current.generation + 1;
        *current = Arc::new(CatalogSnapshot {
            generation,
            captured_at: Utc::now(),
            tables,
            views,
            checksum,
        });
        info!(
            generation,
            tables = current.tables.len(),
            views = current.views.len(),
            "replaced catalog snapshot"
        );
        generation
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

/// The metadata store's arbitrary-query operation, used by the grid's SQL
/// pass-through (filtering, sorting).
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<serde_json::Value, GridError>;
}

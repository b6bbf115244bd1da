//! Grid Mutation Bridge
//!
//! Patches a live grid view outside its normal data-loading path, purely for
//! responsiveness after a write. The grid handle may be absent at call time
//! (view unmounted mid-flight); every mutation checks presence first and
//! no-ops with a diagnostic instead of failing. Row patches are best-effort
//! local edits: the index is the position last known to the caller, with no
//! re-validation against concurrent row-order changes.

use crate::descriptor::GridRow;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Imperative handle onto a rendered grid
pub trait GridHandle: Send + Sync {
    /// Append a row to the rendered row set.
    fn row_added(&self, row: GridRow);

    /// Replace the row at `index`.
    fn row_edited(&self, row: GridRow, index: usize);
}

/// Mount slot plus the two row-patch operations
pub struct GridBridge {
    handle: RwLock<Option<Arc<dyn GridHandle>>>,
}

impl GridBridge {
    pub fn new() -> Self {
        Self {
            handle: RwLock::new(None),
        }
    }

    pub async fn mount(&self, handle: Arc<dyn GridHandle>) {
        *self.handle.write().await = Some(handle);
    }

    pub async fn unmount(&self) {
        *self.handle.write().await = None;
        debug!("grid handle unmounted");
    }

    pub async fn is_mounted(&self) -> bool {
        self.handle.read().await.is_some()
    }

    /// Append `row` without a full refetch. No-op if no grid is mounted.
    pub async fn apply_row_inserted(&self, row: GridRow) {
        match self.handle.read().await.as_ref() {
            Some(handle) => handle.row_added(row),
            None => debug!("dropping row insert, no grid mounted"),
        }
    }

    /// Replace the row at `index` with `row`. No-op if no grid is mounted.
    pub async fn apply_row_updated(&self, row: GridRow, index: usize) {
        match self.handle.read().await.as_ref() {
            Some(handle) => handle.row_edited(row, index),
            None => debug!(index, "dropping row update, no grid mounted"),
        }
    }
}

impl Default for GridBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Headless grid: a plain row buffer implementing [`GridHandle`]. Used by
/// tests and by embedders that render the rows elsewhere.
pub struct BufferedGrid {
    rows: Mutex<Vec<GridRow>>,
}

impl BufferedGrid {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn row(&self, index: usize) -> Option<GridRow> {
        self.rows
            .lock()
            .ok()
            .and_then(|rows| rows.get(index).cloned())
    }

    pub fn rows(&self) -> Vec<GridRow> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }
}

impl Default for BufferedGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl GridHandle for BufferedGrid {
    fn row_added(&self, row: GridRow) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.push(row);
        }
    }

    fn row_edited(&self, row: GridRow, index: usize) {
        if let Ok(mut rows) = self.rows.lock() {
            if index < rows.len() {
                rows[index] = row;
            } else {
                warn!(index, len = rows.len(), "row update index out of range");
            }
        }
    }
}

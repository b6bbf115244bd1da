//! GridSync - table grid editor coordination core
//!
//! Keeps a transient, imperatively-patched data grid consistent with an
//! asynchronously-refreshed schema metadata cache, across row/column/table
//! editing flows that can race with background catalog refreshes.
//!
//! The moving parts, leaf to root:
//! - [`adapter`]: turns a table or view descriptor into a grid-consumable schema
//! - [`resolver`]: re-resolves columns against the current catalog snapshot,
//!   because descriptors held across a refresh are stale
//! - [`bridge`]: patches the rendered grid in place after a write, no refetch
//! - [`panel`]: the row/column/table editor state machine and its commit routing
//!
//! The [`catalog`] module supplies a Postgres-backed provider for the
//! metadata cache; embedders with their own metadata layer only need to
//! implement [`store::QueryExecutor`] and feed [`store::MetadataCache`].

pub mod adapter;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod mutation;
pub mod notify;
pub mod panel;
pub mod resolver;
pub mod store;

pub use adapter::GridSchema;
pub use bridge::{BufferedGrid, GridBridge, GridHandle};
pub use catalog::PgCatalog;
pub use config::CatalogConfig;
pub use descriptor::{
    Column, Entity, EntityKind, ForeignKeyRef, GridRow, Relationship, TableDescriptor,
    ViewDescriptor,
};
pub use error::{GridError, GridResult};
pub use mutation::{ColumnDefinition, CreateTableRequest};
pub use notify::{Notification, NotificationCategory, NotificationSink, TracingSink};
pub use panel::{
    EditingContext, EditorCallbacks, PanelKind, PanelOrchestrator, QueryFailure, QueryOutcome,
    Router,
};
pub use resolver::resolve_column;
pub use store::{CatalogSnapshot, MetadataCache, QueryExecutor};

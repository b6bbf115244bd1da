//! Panel Orchestrator
//!
//! State machine over the editor panels (row/column/table) plus the routing
//! of their completion callbacks. The orchestrator does not decide when a
//! panel opens; callers supply which panel and which entity. It decides what
//! happens once one is open: on commit, patch the live grid through the
//! bridge or navigate to a freshly created table, then always return to the
//! closed state.

use crate::bridge::GridBridge;
use crate::descriptor::{Column, GridRow, TableDescriptor};
use crate::notify::{human_message, Notification, NotificationSink};
use crate::resolver::resolve_column;
use crate::store::{MetadataCache, QueryExecutor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Which editor panel is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    #[default]
    None,
    Row,
    Column,
    Table,
}

/// What the open panel is editing. The entity snapshots are mutually
/// exclusive; the constructors enforce it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingContext {
    pub panel: PanelKind,
    pub is_duplicating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<GridRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<Column>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableDescriptor>,
}

impl EditingContext {
    /// Initial and terminal state: no panel open, no entity held.
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn add_row() -> Self {
        Self {
            panel: PanelKind::Row,
            ..Self::default()
        }
    }

    pub fn edit_row(row: GridRow) -> Self {
        Self {
            panel: PanelKind::Row,
            row: Some(row),
            ..Self::default()
        }
    }

    pub fn add_column() -> Self {
        Self {
            panel: PanelKind::Column,
            ..Self::default()
        }
    }

    pub fn edit_column(column: Column) -> Self {
        Self {
            panel: PanelKind::Column,
            column: Some(column),
            ..Self::default()
        }
    }

    pub fn create_table() -> Self {
        Self {
            panel: PanelKind::Table,
            ..Self::default()
        }
    }

    pub fn edit_table(table: TableDescriptor) -> Self {
        Self {
            panel: PanelKind::Table,
            table: Some(table),
            ..Self::default()
        }
    }

    pub fn duplicate_table(table: TableDescriptor) -> Self {
        Self {
            panel: PanelKind::Table,
            is_duplicating: true,
            table: Some(table),
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.panel != PanelKind::None
    }
}

/// External router collaborator
pub trait Router: Send + Sync {
    fn navigate_to(&self, path: &str);
}

/// Uniform result contract the grid expects from any query-executing
/// collaborator: `{data}` on success, `{error}` on failure, never a raised
/// error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOutcome {
    Data(serde_json::Value),
    Error(QueryFailure),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFailure {
    pub message: String,
}

type UnitCallback = Box<dyn Fn() + Send + Sync>;
type RowCallback = Box<dyn Fn(GridRow) + Send + Sync>;
type ColumnCallback = Box<dyn Fn(Column) + Send + Sync>;

/// Caller-supplied hooks, all defaulted to no-ops
pub struct EditorCallbacks {
    pub on_add_row: UnitCallback,
    pub on_edit_row: RowCallback,
    pub on_add_column: UnitCallback,
    pub on_edit_column: ColumnCallback,
    pub on_delete_column: ColumnCallback,
    pub on_close_panel: UnitCallback,
}

impl Default for EditorCallbacks {
    fn default() -> Self {
        Self {
            on_add_row: Box::new(|| {}),
            on_edit_row: Box::new(|_| {}),
            on_add_column: Box::new(|| {}),
            on_edit_column: Box::new(|_| {}),
            on_delete_column: Box::new(|_| {}),
            on_close_panel: Box::new(|| {}),
        }
    }
}

/// Coordinates the grid, the metadata cache, and the modal editors
pub struct PanelOrchestrator {
    cache: Arc<MetadataCache>,
    bridge: Arc<GridBridge>,
    executor: Arc<dyn QueryExecutor>,
    router: Arc<dyn Router>,
    notifier: Arc<dyn NotificationSink>,
    callbacks: EditorCallbacks,
    context: RwLock<EditingContext>,
    project_ref: String,
}

impl PanelOrchestrator {
    pub fn new(
        cache: Arc<MetadataCache>,
        bridge: Arc<GridBridge>,
        executor: Arc<dyn QueryExecutor>,
        router: Arc<dyn Router>,
        notifier: Arc<dyn NotificationSink>,
        project_ref: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            bridge,
            executor,
            router,
            notifier,
            callbacks: EditorCallbacks::default(),
            context: RwLock::new(EditingContext::closed()),
            project_ref: project_ref.into(),
        }
    }

    pub fn with_callbacks(mut self, callbacks: EditorCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub async fn context(&self) -> EditingContext {
        self.context.read().await.clone()
    }

    /// Open a panel. Which panel and which entity is the caller's decision.
    pub async fn open_panel(&self, context: EditingContext) {
        debug!(panel = ?context.panel, "opening editor panel");
        *self.context.write().await = context;
    }

    /// Return to the closed state, unconditionally and idempotently.
    pub async fn close_panel(&self) {
        *self.context.write().await = EditingContext::closed();
        (self.callbacks.on_close_panel)();
    }

    /// Panel committed a new row: patch the live grid, then close.
    pub async fn handle_row_created(&self, row: GridRow) {
        self.bridge.apply_row_inserted(row).await;
        self.close_panel().await;
    }

    /// Panel committed a row edit: replace it in place, then close.
    pub async fn handle_row_updated(&self, row: GridRow, index: usize) {
        self.bridge.apply_row_updated(row, index).await;
        self.close_panel().await;
    }

    /// Panel committed a new table: the grid for the old table is about to
    /// be torn down, so navigate to the new identifier instead of patching.
    pub async fn handle_table_created(&self, table: &TableDescriptor) {
        self.router
            .navigate_to(&format!("/project/{}/editor/{}", self.project_ref, table.id));
        self.close_panel().await;
    }

    /// Grid asked to create a row: forwarded straight to the caller, which
    /// decides to open the row panel.
    pub fn request_add_row(&self) {
        (self.callbacks.on_add_row)();
    }

    /// Grid asked to edit a row. Rows carry no metadata that can go stale,
    /// so the snapshot is forwarded as-is.
    pub fn request_edit_row(&self, row: GridRow) {
        (self.callbacks.on_edit_row)(row);
    }

    /// Grid asked to add a column.
    pub fn request_add_column(&self) {
        (self.callbacks.on_add_column)();
    }

    /// Grid asked to edit a column. The caller's table reference may be
    /// stale, so re-resolve by id and name before forwarding; on a miss, log
    /// and abort without opening anything.
    pub async fn request_edit_column(&self, table_id: u32, column_name: &str) {
        match resolve_column(&self.cache, table_id, column_name).await {
            Ok(column) => (self.callbacks.on_edit_column)(column),
            Err(e) => error!(table_id, column_name, "cannot edit column: {e}"),
        }
    }

    /// Grid asked to delete a column. Same resolution rule as editing: a
    /// miss aborts the delete rather than forwarding an absent column.
    pub async fn request_delete_column(&self, table_id: u32, column_name: &str) {
        match resolve_column(&self.cache, table_id, column_name).await {
            Ok(column) => (self.callbacks.on_delete_column)(column),
            Err(e) => error!(table_id, column_name, "cannot delete column: {e}"),
        }
    }

    /// SQL pass-through for grid-driven filtering and sorting. Failures are
    /// folded into the outcome and surfaced via the notification sink; this
    /// never returns an error.
    pub async fn run_query(&self, sql: &str) -> QueryOutcome {
        match self.executor.execute(sql).await {
            Ok(data) => QueryOutcome::Data(data),
            Err(e) => {
                let message = human_message(&e);
                self.notifier.notify(Notification::error(message.clone()));
                QueryOutcome::Error(QueryFailure { message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BufferedGrid;
    use crate::descriptor::Column;
    use crate::error::GridError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingRouter {
        paths: Mutex<Vec<String>>,
    }

    impl RecordingRouter {
        fn new() -> Self {
            Self {
                paths: Mutex::new(Vec::new()),
            }
        }

        fn last(&self) -> Option<String> {
            self.paths.lock().unwrap().last().cloned()
        }
    }

    impl Router for RecordingRouter {
        fn navigate_to(&self, path: &str) {
            self.paths.lock().unwrap().push(path.to_string());
        }
    }

    struct RecordingSink {
        messages: Mutex<Vec<Notification>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                messages: Mutex::new(Vec::new()),
            }
        }
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, notification: Notification) {
            self.messages.lock().unwrap().push(notification);
        }
    }

    struct StubExecutor {
        result: Result<serde_json::Value, String>,
    }

    #[async_trait]
    impl QueryExecutor for StubExecutor {
        async fn execute(&self, _sql: &str) -> Result<serde_json::Value, GridError> {
            self.result
                .clone()
                .map_err(GridError::QueryExecution)
        }
    }

    struct Fixture {
        cache: Arc<MetadataCache>,
        grid: Arc<BufferedGrid>,
        router: Arc<RecordingRouter>,
        sink: Arc<RecordingSink>,
        orchestrator: PanelOrchestrator,
    }

    async fn fixture(result: Result<serde_json::Value, String>) -> Fixture {
        let cache = Arc::new(MetadataCache::new());
        let bridge = Arc::new(GridBridge::new());
        let grid = Arc::new(BufferedGrid::new());
        bridge.mount(grid.clone()).await;
        let router = Arc::new(RecordingRouter::new());
        let sink = Arc::new(RecordingSink::new());
        let orchestrator = PanelOrchestrator::new(
            cache.clone(),
            bridge,
            Arc::new(StubExecutor { result }),
            router.clone(),
            sink.clone(),
            "demo",
        );
        Fixture {
            cache,
            grid,
            router,
            sink,
            orchestrator,
        }
    }

    fn row(name: &str) -> GridRow {
        let mut row = GridRow::new();
        row.insert("name".to_string(), json!(name));
        row
    }

    fn users_table() -> TableDescriptor {
        TableDescriptor {
            id: 1,
            schema: "public".to_string(),
            name: "users".to_string(),
            columns: vec![Column {
                name: "email".to_string(),
                data_type: "text".to_string(),
                nullable: false,
                default_value: None,
                foreign_key: None,
            }],
            primary_keys: vec![],
            relationships: vec![],
        }
    }

    #[tokio::test]
    async fn test_row_created_patches_grid_and_closes() {
        let f = fixture(Ok(json!([]))).await;
        f.orchestrator.open_panel(EditingContext::add_row()).await;

        f.orchestrator.handle_row_created(row("ada")).await;

        assert_eq!(f.grid.row_count(), 1);
        assert_eq!(f.orchestrator.context().await.panel, PanelKind::None);
    }

    #[tokio::test]
    async fn test_row_updated_replaces_index_and_closes() {
        let f = fixture(Ok(json!([]))).await;
        f.orchestrator.handle_row_created(row("ada")).await;
        f.orchestrator.handle_row_created(row("grace")).await;

        f.orchestrator
            .open_panel(EditingContext::edit_row(row("grace")))
            .await;
        f.orchestrator.handle_row_updated(row("lin"), 1).await;

        assert_eq!(f.grid.row(1).unwrap()["name"], json!("lin"));
        assert_eq!(f.grid.row_count(), 2);
        assert_eq!(f.orchestrator.context().await.panel, PanelKind::None);
    }

    #[tokio::test]
    async fn test_table_created_navigates_instead_of_patching() {
        let f = fixture(Ok(json!([]))).await;
        f.orchestrator
            .open_panel(EditingContext::create_table())
            .await;

        f.orchestrator.handle_table_created(&users_table()).await;

        assert_eq!(f.router.last().unwrap(), "/project/demo/editor/1");
        assert_eq!(f.grid.row_count(), 0);
        assert_eq!(f.orchestrator.context().await.panel, PanelKind::None);
    }

    #[tokio::test]
    async fn test_close_panel_is_unconditional_and_idempotent() {
        let f = fixture(Ok(json!([]))).await;
        for context in [
            EditingContext::add_row(),
            EditingContext::add_column(),
            EditingContext::edit_table(users_table()),
        ] {
            f.orchestrator.open_panel(context).await;
            f.orchestrator.close_panel().await;
            assert_eq!(f.orchestrator.context().await.panel, PanelKind::None);
            // Closing again is safe.
            f.orchestrator.close_panel().await;
            assert_eq!(f.orchestrator.context().await.panel, PanelKind::None);
        }
    }

    #[tokio::test]
    async fn test_edit_column_forwards_resolved_column() {
        let f = fixture(Ok(json!([]))).await;
        f.cache.replace(vec![users_table()], vec![]).await;

        let seen: Arc<Mutex<Option<Column>>> = Arc::new(Mutex::new(None));
        let seen_in_cb = seen.clone();
        let orchestrator = PanelOrchestrator::new(
            f.cache.clone(),
            Arc::new(GridBridge::new()),
            Arc::new(StubExecutor { result: Ok(json!([])) }),
            f.router.clone(),
            f.sink.clone(),
            "demo",
        )
        .with_callbacks(EditorCallbacks {
            on_edit_column: Box::new(move |column| {
                *seen_in_cb.lock().unwrap() = Some(column);
            }),
            ..Default::default()
        });

        orchestrator.request_edit_column(1, "email").await;
        assert_eq!(seen.lock().unwrap().as_ref().unwrap().name, "email");
    }

    #[tokio::test]
    async fn test_delete_column_aborts_on_resolution_miss() {
        let f = fixture(Ok(json!([]))).await;
        f.cache.replace(vec![users_table()], vec![]).await;

        let called = Arc::new(Mutex::new(false));
        let called_in_cb = called.clone();
        let orchestrator = PanelOrchestrator::new(
            f.cache.clone(),
            Arc::new(GridBridge::new()),
            Arc::new(StubExecutor { result: Ok(json!([])) }),
            f.router.clone(),
            f.sink.clone(),
            "demo",
        )
        .with_callbacks(EditorCallbacks {
            on_delete_column: Box::new(move |_| {
                *called_in_cb.lock().unwrap() = true;
            }),
            ..Default::default()
        });

        orchestrator.request_delete_column(1, "phone").await;
        assert!(!*called.lock().unwrap());

        orchestrator.request_delete_column(99, "email").await;
        assert!(!*called.lock().unwrap());
    }

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_edit_column_miss_logs_and_aborts() {
        let capture = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();

        let called = Arc::new(Mutex::new(false));
        let called_in_cb = called.clone();
        tracing::subscriber::with_default(subscriber, || {
            tokio_test::block_on(async {
                let cache = Arc::new(MetadataCache::new());
                cache.replace(vec![users_table()], vec![]).await;
                let orchestrator = PanelOrchestrator::new(
                    cache,
                    Arc::new(GridBridge::new()),
                    Arc::new(StubExecutor { result: Ok(json!([])) }),
                    Arc::new(RecordingRouter::new()),
                    Arc::new(RecordingSink::new()),
                    "demo",
                )
                .with_callbacks(EditorCallbacks {
                    on_edit_column: Box::new(move |_| {
                        *called_in_cb.lock().unwrap() = true;
                    }),
                    ..Default::default()
                });

                orchestrator.request_edit_column(1, "phone").await;
                orchestrator.request_edit_column(99, "email").await;
            });
        });

        // The action aborts without opening anything, leaving a diagnostic.
        assert!(!*called.lock().unwrap());
        let logs = capture.contents();
        assert!(logs.contains("cannot edit column"));
        assert!(logs.contains("column phone not found in table users"));
        assert!(logs.contains("table 99 not found in catalog snapshot"));
    }

    #[tokio::test]
    async fn test_row_and_column_requests_forward_to_callbacks() {
        let f = fixture(Ok(json!([]))).await;
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        let orchestrator = PanelOrchestrator::new(
            f.cache.clone(),
            Arc::new(GridBridge::new()),
            Arc::new(StubExecutor { result: Ok(json!([])) }),
            f.router.clone(),
            f.sink.clone(),
            "demo",
        )
        .with_callbacks(EditorCallbacks {
            on_add_row: Box::new(move || l1.lock().unwrap().push("add_row".to_string())),
            on_edit_row: Box::new(move |_| l2.lock().unwrap().push("edit_row".to_string())),
            on_add_column: Box::new(move || l3.lock().unwrap().push("add_column".to_string())),
            ..Default::default()
        });

        orchestrator.request_add_row();
        orchestrator.request_edit_row(row("ada"));
        orchestrator.request_add_column();
        assert_eq!(log.lock().unwrap().join(","), "add_row,edit_row,add_column");
    }

    #[tokio::test]
    async fn test_query_error_folds_into_outcome() {
        let f = fixture(Err("syntax error".to_string())).await;

        let outcome = f.orchestrator.run_query("select nope").await;
        match outcome {
            QueryOutcome::Error(failure) => assert_eq!(failure.message, "syntax error"),
            QueryOutcome::Data(_) => panic!("expected error outcome"),
        }

        let messages = f.sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "syntax error");
    }

    #[tokio::test]
    async fn test_query_success_wraps_data() {
        let f = fixture(Ok(json!([{ "id": 1 }]))).await;

        let outcome = f.orchestrator.run_query("select * from users").await;
        match outcome {
            QueryOutcome::Data(data) => assert_eq!(data[0]["id"], json!(1)),
            QueryOutcome::Error(_) => panic!("expected data outcome"),
        }
        assert!(f.sink.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_query_outcome_serialization_shape() {
        let err = QueryOutcome::Error(QueryFailure {
            message: "syntax error".to_string(),
        });
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["error"]["message"], json!("syntax error"));

        let ok = QueryOutcome::Data(json!([1, 2]));
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["data"], json!([1, 2]));
    }

    #[test]
    fn test_editing_context_constructors_are_exclusive() {
        let ctx = EditingContext::edit_column(Column {
            name: "email".to_string(),
            data_type: "text".to_string(),
            nullable: false,
            default_value: None,
            foreign_key: None,
        });
        assert_eq!(ctx.panel, PanelKind::Column);
        assert!(ctx.row.is_none());
        assert!(ctx.table.is_none());

        let ctx = EditingContext::duplicate_table(users_table());
        assert!(ctx.is_duplicating);
        assert!(ctx.column.is_none());
    }
}

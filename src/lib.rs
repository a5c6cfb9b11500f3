pub mod errors;
pub mod export;
pub mod models;
pub mod query;
pub mod report;
pub mod service;
pub mod storage;
pub mod store;

pub use errors::{AppError, AppResult};
pub use models::{
    BlockedItem, CreateTodoPayload, DeleteTodoResponse, DependencyContext, ListTodosRequest,
    OverdueItem, ProjectInfo, ProjectSummary, ReportGroup, ReportGroupBy, ReportOptions,
    ReportTimeframe, SearchRequest, SortBy, SortOrder, Todo, TodoFilters, TodoPriority,
    TodoReport, TodoStats, TodoStatus, UpdateTodoPayload,
};
pub use service::{ServiceConfig, TodoService, DEFAULT_PROJECT};
pub use storage::{LoadedCollection, ProjectStorage};
pub use store::TodoStore;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "taskvault.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

use crate::errors::{AppError, AppResult};
use crate::export;
use crate::models::{
    CreateTodoPayload, DeleteTodoResponse, DependencyContext, ListTodosRequest, ProjectInfo,
    ProjectSummary, ReportOptions, SearchRequest, Todo, TodoReport, TodoStats, UpdateTodoPayload,
};
use crate::query;
use crate::report;
use crate::storage::{sanitize_component, ProjectStorage};
use crate::store::TodoStore;
use chrono::Utc;
use std::path::PathBuf;

pub const DEFAULT_PROJECT: &str = "default";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub initial_project: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let data_dir = std::env::var("TASKVAULT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".taskvault"));
        Self {
            data_dir,
            initial_project: DEFAULT_PROJECT.to_string(),
        }
    }
}

/// Typed command boundary over the active collection. Exactly one project is
/// active at a time; every mutating command awaits its persistence write
/// before returning.
pub struct TodoService {
    storage: ProjectStorage,
    store: TodoStore,
}

impl TodoService {
    pub async fn open(config: ServiceConfig) -> AppResult<Self> {
        let storage = ProjectStorage::new(config.data_dir);
        let loaded = storage.load(&config.initial_project).await?;
        if !loaded.existed {
            tracing::debug!(project = %config.initial_project, "activating new project");
        }
        Ok(Self {
            storage,
            store: TodoStore::new(config.initial_project, loaded.todos),
        })
    }

    pub async fn create_todo(&mut self, payload: CreateTodoPayload) -> AppResult<Todo> {
        let todo = self.store.create(payload)?;
        self.persist().await?;
        Ok(todo)
    }

    pub async fn update_todo(&mut self, id: &str, payload: UpdateTodoPayload) -> AppResult<Todo> {
        let todo = self.store.update(id, payload)?;
        self.persist().await?;
        Ok(todo)
    }

    pub async fn delete_todo(&mut self, id: &str, force: bool) -> AppResult<DeleteTodoResponse> {
        let response = self.store.delete(id, force)?;
        self.persist().await?;
        Ok(response)
    }

    pub fn get_todo(&self, id: &str) -> AppResult<Todo> {
        self.store.get(id)
    }

    pub fn list_todos(&self, request: ListTodosRequest) -> Vec<Todo> {
        let filtered = query::filter(self.store.todos(), &request.filters);
        let sorted = match request.sort_by {
            Some(by) => query::sort(filtered, by, request.order.unwrap_or_default()),
            None => filtered,
        };
        query::limit(sorted, request.limit)
    }

    pub fn search_todos(&self, request: &SearchRequest) -> Vec<Todo> {
        query::search(self.store.todos(), request)
    }

    pub fn dependency_context(&self, id: &str) -> AppResult<DependencyContext> {
        query::dependency_context(self.store.todos(), id)
    }

    pub fn get_stats(&self) -> TodoStats {
        report::stats(self.store.todos(), Utc::now())
    }

    pub fn generate_report(&self, options: &ReportOptions) -> TodoReport {
        report::report(self.store.todos(), options, Utc::now())
    }

    pub fn export_csv(&self) -> String {
        export::csv_snapshot(self.store.todos())
    }

    pub fn export_markdown(&self) -> String {
        export::markdown_snapshot(self.store.todos())
    }

    pub fn current_project(&self) -> &str {
        self.store.project()
    }

    pub fn get_project_info(&self) -> ProjectInfo {
        ProjectInfo {
            project: self.store.project().to_string(),
            todo_count: self.store.len(),
            data_dir: self
                .storage
                .project_dir(self.store.project())
                .to_string_lossy()
                .to_string(),
        }
    }

    /// Flushes the outgoing collection, then swaps in the named project's
    /// collection (empty when it has never been persisted).
    pub async fn switch_project(&mut self, name: &str) -> AppResult<ProjectInfo> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Invalid("project name must not be empty".to_string()));
        }
        if name == self.store.project() {
            return Ok(self.get_project_info());
        }

        self.persist().await?;

        let loaded = self.storage.load(name).await?;
        if !loaded.existed {
            tracing::debug!(project = name, "switching to new project");
        }
        self.store = TodoStore::new(name, loaded.todos);
        // First persist of the incoming project creates it in the namespace.
        self.persist().await?;

        Ok(self.get_project_info())
    }

    pub async fn list_projects(&self) -> AppResult<Vec<ProjectSummary>> {
        let active_dir = sanitize_component(self.store.project());
        let mut summaries = Vec::new();
        let mut saw_active = false;

        for name in self.storage.list_projects().await? {
            let active = name == active_dir;
            saw_active = saw_active || active;
            let todo_count = if active {
                self.store.len()
            } else {
                self.storage.todo_count(&name).await?
            };
            summaries.push(ProjectSummary {
                name,
                todo_count,
                active,
            });
        }

        if !saw_active {
            summaries.push(ProjectSummary {
                name: self.store.project().to_string(),
                todo_count: self.store.len(),
                active: true,
            });
            summaries.sort_by(|a, b| a.name.cmp(&b.name));
        }

        Ok(summaries)
    }

    async fn persist(&self) -> AppResult<()> {
        self.storage
            .save(self.store.project(), self.store.todos())
            .await
    }
}

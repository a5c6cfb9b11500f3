use crate::errors::{AppError, AppResult};
use crate::models::{CreateTodoPayload, DeleteTodoResponse, Todo, TodoStatus, UpdateTodoPayload};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

/// The in-memory ordered collection for the currently active project. Pure
/// of I/O: the service persists the collection after every mutation.
#[derive(Debug, Clone)]
pub struct TodoStore {
    project: String,
    todos: Vec<Todo>,
}

impl TodoStore {
    pub fn new(project: impl Into<String>, todos: Vec<Todo>) -> Self {
        Self {
            project: project.into(),
            todos,
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Read-only snapshot for the query engine and report aggregator.
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> AppResult<Todo> {
        self.todos
            .iter()
            .find(|todo| todo.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Todo '{}' not found", id)))
    }

    pub fn create(&mut self, payload: CreateTodoPayload) -> AppResult<Todo> {
        let title = payload.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Invalid("title must not be empty".to_string()));
        }

        let now = Utc::now();
        let mut id = new_todo_id(now);
        while self.todos.iter().any(|todo| todo.id == id) {
            id = new_todo_id(now);
        }

        // Dependency ids are accepted as-is; dangling references are
        // tolerated and surfaced later by dependency_context.
        let todo = Todo {
            id,
            title,
            description: payload.description,
            status: TodoStatus::Pending,
            priority: payload.priority.unwrap_or_default(),
            progress: 0,
            created_at: now,
            updated_at: now,
            due_date: payload.due_date,
            tags: dedup_preserving_order(payload.tags),
            dependencies: dedup_preserving_order(payload.dependencies),
            metadata: payload.metadata,
        };

        self.todos.push(todo.clone());
        Ok(todo)
    }

    pub fn update(&mut self, id: &str, payload: UpdateTodoPayload) -> AppResult<Todo> {
        let todo = self
            .todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Todo '{}' not found", id)))?;

        let previous_status = todo.status;

        if let Some(title) = payload.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Invalid("title must not be empty".to_string()));
            }
            todo.title = title;
        }
        if let Some(description) = payload.description {
            todo.description = Some(description);
        }
        if let Some(priority) = payload.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = payload.due_date {
            todo.due_date = Some(due_date);
        }

        todo.tags = apply_set_update(
            std::mem::take(&mut todo.tags),
            payload.tags,
            payload.add_tags,
            payload.remove_tags,
        );
        todo.dependencies = apply_set_update(
            std::mem::take(&mut todo.dependencies),
            payload.dependencies,
            payload.add_dependencies,
            payload.remove_dependencies,
        );

        if let Some(patch) = payload.metadata {
            // Additive shallow merge: same-named keys are overwritten,
            // untouched keys survive.
            for (key, value) in patch {
                todo.metadata.insert(key, value);
            }
        }

        if let Some(progress) = payload.progress {
            todo.progress = progress.min(100);
        }
        if let Some(status) = payload.status {
            todo.status = status;
            if payload.progress.is_none() {
                if status == TodoStatus::Completed {
                    todo.progress = 100;
                } else if status == TodoStatus::Pending && previous_status != TodoStatus::Pending {
                    todo.progress = 0;
                }
            }
        }

        todo.updated_at = Utc::now();
        Ok(todo.clone())
    }

    /// Refuses to delete a record other records still depend on unless
    /// forced; forcing strips the id from every other dependency set first.
    pub fn delete(&mut self, id: &str, force: bool) -> AppResult<DeleteTodoResponse> {
        if !self.todos.iter().any(|todo| todo.id == id) {
            return Err(AppError::NotFound(format!("Todo '{}' not found", id)));
        }

        let dependents: Vec<String> = self
            .todos
            .iter()
            .filter(|todo| todo.id != id && todo.dependencies.iter().any(|dep| dep == id))
            .map(|todo| todo.id.clone())
            .collect();

        if !dependents.is_empty() && !force {
            return Err(AppError::DependencyBlocked {
                id: id.to_string(),
                blockers: dependents,
            });
        }

        let now = Utc::now();
        for todo in &mut self.todos {
            if todo.dependencies.iter().any(|dep| dep == id) {
                todo.dependencies.retain(|dep| dep != id);
                todo.updated_at = now;
            }
        }
        self.todos.retain(|todo| todo.id != id);

        Ok(DeleteTodoResponse {
            id: id.to_string(),
            released_dependents: dependents,
        })
    }
}

/// Full replacement wins over the incremental add/remove sets; otherwise
/// adds are a set union and removes a set difference, insertion order kept.
fn apply_set_update(
    current: Vec<String>,
    replace: Option<Vec<String>>,
    add: Option<Vec<String>>,
    remove: Option<Vec<String>>,
) -> Vec<String> {
    if let Some(replacement) = replace {
        return dedup_preserving_order(replacement);
    }

    let mut values = current;
    if let Some(additions) = add {
        values.extend(additions);
        values = dedup_preserving_order(values);
    }
    if let Some(removals) = remove {
        let removals: HashSet<&String> = removals.iter().collect();
        values.retain(|value| !removals.contains(value));
    }
    values
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if seen.insert(value.clone()) {
            out.push(value);
        }
    }
    out
}

fn new_todo_id(now: DateTime<Utc>) -> String {
    let short = Uuid::new_v4().simple().to_string();
    format!(
        "todo_{}_{}_{}",
        now.format("%Y%m%d"),
        now.format("%H%M%S"),
        &short[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> TodoStore {
        TodoStore::new("test", Vec::new())
    }

    fn create_payload(title: &str) -> CreateTodoPayload {
        CreateTodoPayload {
            title: title.to_string(),
            description: None,
            priority: None,
            due_date: None,
            tags: Vec::new(),
            dependencies: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn create_defaults_to_pending_medium_zero_progress() {
        let mut store = store();
        let todo = store.create(create_payload("Design API")).expect("create");

        assert_eq!(todo.status, TodoStatus::Pending);
        assert_eq!(todo.priority, crate::models::TodoPriority::Medium);
        assert_eq!(todo.progress, 0);
        assert!(todo.id.starts_with("todo_"));
        assert_eq!(todo.created_at, todo.updated_at);
    }

    #[test]
    fn create_rejects_blank_title() {
        let mut store = store();
        let error = store.create(create_payload("   ")).expect_err("must reject");
        assert!(error.to_string().contains("INVALID_INPUT"));
    }

    #[test]
    fn create_dedupes_tags_and_dependencies() {
        let mut store = store();
        let mut payload = create_payload("Tagged");
        payload.tags = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        payload.dependencies = vec!["x".to_string(), "x".to_string()];

        let todo = store.create(payload).expect("create");
        assert_eq!(todo.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(todo.dependencies, vec!["x".to_string()]);
    }

    #[test]
    fn completing_without_explicit_progress_sets_100() {
        let mut store = store();
        let todo = store.create(create_payload("Finish")).expect("create");

        let updated = store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    status: Some(TodoStatus::Completed),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("update");
        assert_eq!(updated.progress, 100);
    }

    #[test]
    fn reverting_to_pending_without_explicit_progress_resets_to_0() {
        let mut store = store();
        let todo = store.create(create_payload("Restart")).expect("create");

        store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    status: Some(TodoStatus::InProgress),
                    progress: Some(40),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("to in-progress");

        let reverted = store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    status: Some(TodoStatus::Pending),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("back to pending");
        assert_eq!(reverted.progress, 0);
    }

    #[test]
    fn explicit_progress_wins_over_status_auto_adjustment() {
        let mut store = store();
        let todo = store.create(create_payload("Partial")).expect("create");

        let updated = store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    status: Some(TodoStatus::Completed),
                    progress: Some(90),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("update");
        assert_eq!(updated.progress, 90);
    }

    #[test]
    fn progress_is_clamped_to_100() {
        let mut store = store();
        let todo = store.create(create_payload("Overshoot")).expect("create");

        let updated = store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    progress: Some(250),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("update");
        assert_eq!(updated.progress, 100);
    }

    #[test]
    fn empty_update_changes_only_updated_at() {
        let mut store = store();
        let created = store.create(create_payload("Idle")).expect("create");

        let updated = store
            .update(&created.id, UpdateTodoPayload::default())
            .expect("update");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.status, created.status);
        assert_eq!(updated.priority, created.priority);
        assert_eq!(updated.progress, created.progress);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.tags, created.tags);
        assert_eq!(updated.dependencies, created.dependencies);
        assert_eq!(updated.metadata, created.metadata);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn tag_replacement_takes_precedence_over_add_remove() {
        let mut store = store();
        let mut payload = create_payload("Tags");
        payload.tags = vec!["old".to_string()];
        let todo = store.create(payload).expect("create");

        let updated = store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    tags: Some(vec!["fresh".to_string()]),
                    add_tags: Some(vec!["ignored".to_string()]),
                    remove_tags: Some(vec!["fresh".to_string()]),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("update");
        assert_eq!(updated.tags, vec!["fresh".to_string()]);
    }

    #[test]
    fn incremental_tag_update_is_union_then_difference() {
        let mut store = store();
        let mut payload = create_payload("Tags");
        payload.tags = vec!["a".to_string(), "b".to_string()];
        let todo = store.create(payload).expect("create");

        let updated = store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    add_tags: Some(vec!["b".to_string(), "c".to_string()]),
                    remove_tags: Some(vec!["a".to_string()]),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("update");
        assert_eq!(updated.tags, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn metadata_merge_is_additive_and_overwrites_same_keys() {
        let mut store = store();
        let mut payload = create_payload("Meta");
        payload.metadata = serde_json::Map::from_iter([
            ("kept".to_string(), json!("original")),
            ("replaced".to_string(), json!(1)),
        ]);
        let todo = store.create(payload).expect("create");

        let mut patch = serde_json::Map::new();
        patch.insert("replaced".to_string(), json!({"nested": true}));
        patch.insert("added".to_string(), json!([1, 2, 3]));

        let updated = store
            .update(
                &todo.id,
                UpdateTodoPayload {
                    metadata: Some(patch),
                    ..UpdateTodoPayload::default()
                },
            )
            .expect("update");

        assert_eq!(updated.metadata.get("kept"), Some(&json!("original")));
        assert_eq!(updated.metadata.get("replaced"), Some(&json!({"nested": true})));
        assert_eq!(updated.metadata.get("added"), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn delete_without_force_is_blocked_by_dependents() {
        let mut store = store();
        let base = store.create(create_payload("Base")).expect("create base");
        let mut payload = create_payload("Dependent");
        payload.dependencies = vec![base.id.clone()];
        let dependent = store.create(payload).expect("create dependent");

        let error = store.delete(&base.id, false).expect_err("must block");
        match error {
            AppError::DependencyBlocked { id, blockers } => {
                assert_eq!(id, base.id);
                assert_eq!(blockers, vec![dependent.id.clone()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(store.get(&base.id).is_ok());
    }

    #[test]
    fn forced_delete_cascades_dependency_cleanup() {
        let mut store = store();
        let base = store.create(create_payload("Base")).expect("create base");
        let mut payload = create_payload("Dependent");
        payload.dependencies = vec![base.id.clone(), "dangling".to_string()];
        let dependent = store.create(payload).expect("create dependent");

        let response = store.delete(&base.id, true).expect("force delete");
        assert_eq!(response.released_dependents, vec![dependent.id.clone()]);
        assert!(store.get(&base.id).is_err());

        let remaining = store.get(&dependent.id).expect("dependent survives");
        assert_eq!(remaining.dependencies, vec!["dangling".to_string()]);
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let mut store = store();
        let error = store.delete("todo_missing", false).expect_err("not found");
        assert!(error.to_string().contains("NOT_FOUND"));
    }
}

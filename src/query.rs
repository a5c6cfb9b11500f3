use crate::errors::{AppError, AppResult};
use crate::models::{DependencyContext, SearchRequest, SortBy, SortOrder, Todo, TodoFilters};
use std::cmp::Ordering;

/// Conjunctive predicate: every provided filter must match.
pub fn filter(todos: &[Todo], filters: &TodoFilters) -> Vec<Todo> {
    todos
        .iter()
        .filter(|todo| {
            if let Some(status) = filters.status {
                if todo.status != status {
                    return false;
                }
            }
            if let Some(priority) = filters.priority {
                if todo.priority != priority {
                    return false;
                }
            }
            if let Some(tag) = filters.tag.as_ref() {
                if !todo.tags.iter().any(|candidate| candidate == tag) {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect()
}

/// Stable sort; ties keep encounter order. Undated todos sort after dated
/// ones regardless of direction.
pub fn sort(mut todos: Vec<Todo>, by: SortBy, order: SortOrder) -> Vec<Todo> {
    todos.sort_by(|a, b| compare(a, b, by, order));
    todos
}

pub fn limit(mut todos: Vec<Todo>, limit: Option<usize>) -> Vec<Todo> {
    if let Some(limit) = limit {
        todos.truncate(limit);
    }
    todos
}

/// Substring match over title, description, tags, and serialized metadata.
pub fn search(todos: &[Todo], request: &SearchRequest) -> Vec<Todo> {
    let needle = if request.case_sensitive {
        request.query.clone()
    } else {
        request.query.to_lowercase()
    };

    todos
        .iter()
        .filter(|todo| {
            let mut haystacks = vec![todo.title.clone()];
            if let Some(description) = todo.description.as_ref() {
                haystacks.push(description.clone());
            }
            haystacks.extend(todo.tags.iter().cloned());
            if !todo.metadata.is_empty() {
                haystacks.push(serde_json::to_string(&todo.metadata).unwrap_or_default());
            }

            haystacks.iter().any(|haystack| {
                if request.case_sensitive {
                    haystack.contains(&needle)
                } else {
                    haystack.to_lowercase().contains(&needle)
                }
            })
        })
        .cloned()
        .collect()
}

/// Resolves a record's dependency ids and finds the records depending on it.
/// Ids that resolve to nothing are reported as unknown, never as errors.
pub fn dependency_context(todos: &[Todo], id: &str) -> AppResult<DependencyContext> {
    let todo = todos
        .iter()
        .find(|todo| todo.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Todo '{}' not found", id)))?;

    let mut resolved_dependencies = Vec::new();
    let mut unknown_dependency_ids = Vec::new();
    for dep_id in &todo.dependencies {
        match todos.iter().find(|candidate| candidate.id == *dep_id) {
            Some(dep) => resolved_dependencies.push(dep.clone()),
            None => unknown_dependency_ids.push(dep_id.clone()),
        }
    }

    let dependents: Vec<Todo> = todos
        .iter()
        .filter(|candidate| candidate.id != id && candidate.dependencies.iter().any(|dep| dep == id))
        .cloned()
        .collect();

    Ok(DependencyContext {
        todo,
        resolved_dependencies,
        unknown_dependency_ids,
        dependents,
    })
}

fn compare(a: &Todo, b: &Todo, by: SortBy, order: SortOrder) -> Ordering {
    match by {
        SortBy::Created => direction(a.created_at.cmp(&b.created_at), order),
        SortBy::Updated => direction(a.updated_at.cmp(&b.updated_at), order),
        SortBy::Priority => direction(a.priority.rank().cmp(&b.priority.rank()), order),
        SortBy::Progress => direction(a.progress.cmp(&b.progress), order),
        SortBy::DueDate => match (a.due_date, b.due_date) {
            (Some(left), Some(right)) => direction(left.cmp(&right), order),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

fn direction(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

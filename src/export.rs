use crate::models::Todo;

const COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "status",
    "priority",
    "progress",
    "createdAt",
    "updatedAt",
    "dueDate",
    "tags",
    "dependencies",
];

/// Full-collection snapshot as CSV. Pure projection, no state.
pub fn csv_snapshot(todos: &[Todo]) -> String {
    let mut out = String::new();
    out.push_str(&COLUMNS.join(","));
    out.push('\n');
    for todo in todos {
        let row: Vec<String> = row_values(todo).into_iter().map(|value| csv_field(&value)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Full-collection snapshot as a markdown table.
pub fn markdown_snapshot(todos: &[Todo]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", COLUMNS.join(" | ")));
    out.push_str(&format!("|{}\n", " --- |".repeat(COLUMNS.len())));
    for todo in todos {
        let row: Vec<String> = row_values(todo)
            .into_iter()
            .map(|value| markdown_field(&value))
            .collect();
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}

fn row_values(todo: &Todo) -> Vec<String> {
    vec![
        todo.id.clone(),
        todo.title.clone(),
        todo.description.clone().unwrap_or_default(),
        todo.status.as_str().to_string(),
        todo.priority.as_str().to_string(),
        todo.progress.to_string(),
        todo.created_at.to_rfc3339(),
        todo.updated_at.to_rfc3339(),
        todo.due_date.map(|due| due.to_rfc3339()).unwrap_or_default(),
        todo.tags.join(";"),
        todo.dependencies.join(";"),
    ]
}

/// Embedded quotes are doubled and the field wrapped when it contains a
/// delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn markdown_field(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TodoPriority, TodoStatus};
    use chrono::Utc;

    fn todo(title: &str) -> Todo {
        let now = Utc::now();
        Todo {
            id: "todo_1".to_string(),
            title: title.to_string(),
            description: None,
            status: TodoStatus::Pending,
            priority: TodoPriority::Medium,
            progress: 0,
            created_at: now,
            updated_at: now,
            due_date: None,
            tags: Vec::new(),
            dependencies: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn csv_doubles_embedded_quotes_and_wraps_commas() {
        let record = todo("Say \"hello\", then deploy");
        let csv = csv_snapshot(&[record]);
        assert!(csv.contains("\"Say \"\"hello\"\", then deploy\""));
    }

    #[test]
    fn csv_leaves_plain_fields_unquoted() {
        let record = todo("Plain title");
        let csv = csv_snapshot(&[record]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Plain title"));
        assert!(!lines[1].contains("\"Plain title\""));
    }

    #[test]
    fn markdown_escapes_pipes() {
        let record = todo("left | right");
        let markdown = markdown_snapshot(&[record]);
        assert!(markdown.contains("left \\| right"));
        let lines: Vec<&str> = markdown.lines().collect();
        assert!(lines[0].starts_with("| id |"));
        assert!(lines[1].contains("---"));
    }
}

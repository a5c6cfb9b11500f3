use crate::models::{
    BlockedItem, OverdueItem, ReportGroup, ReportGroupBy, ReportOptions, ReportTimeframe, Todo,
    TodoReport, TodoStats, TodoStatus,
};
use chrono::{DateTime, Duration, Local, LocalResult, Months, NaiveTime, Utc};
use std::collections::BTreeMap;

pub fn stats(todos: &[Todo], now: DateTime<Utc>) -> TodoStats {
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_priority: BTreeMap<String, usize> = BTreeMap::new();
    for todo in todos {
        *by_status.entry(todo.status.as_str().to_string()).or_insert(0) += 1;
        *by_priority
            .entry(todo.priority.as_str().to_string())
            .or_insert(0) += 1;
    }

    TodoStats {
        total: todos.len(),
        by_status,
        by_priority,
        average_progress: average_progress(todos),
        overdue: todos.iter().filter(|todo| todo.is_overdue(now)).count(),
    }
}

pub fn report(todos: &[Todo], options: &ReportOptions, now: DateTime<Utc>) -> TodoReport {
    let window_start = timeframe_start(options.timeframe, now);

    let selected: Vec<&Todo> = todos
        .iter()
        .filter(|todo| options.include_completed || todo.status != TodoStatus::Completed)
        .filter(|todo| match window_start {
            Some(start) => todo.created_at >= start || todo.updated_at >= start,
            None => true,
        })
        .collect();

    let mut buckets: BTreeMap<String, Vec<Todo>> = BTreeMap::new();
    for todo in &selected {
        buckets
            .entry(group_key(todo, options.group_by))
            .or_default()
            .push((*todo).clone());
    }

    let groups = buckets
        .into_iter()
        .map(|(key, members)| ReportGroup {
            count: members.len(),
            average_progress: average_progress(&members),
            key,
            todos: members,
        })
        .collect();

    let overdue = selected
        .iter()
        .filter(|todo| todo.is_overdue(now))
        .filter_map(|todo| {
            todo.due_date.map(|due| OverdueItem {
                id: todo.id.clone(),
                title: todo.title.clone(),
                due_date: due,
                days_overdue: (now - due).num_days(),
            })
        })
        .collect();

    // Dependency completion is resolved against the full snapshot so a
    // windowed report still sees dependencies finished long ago.
    let blocked = selected
        .iter()
        .filter(|todo| todo.status == TodoStatus::Blocked)
        .map(|todo| {
            let completed = todo
                .dependencies
                .iter()
                .filter(|dep_id| {
                    todos
                        .iter()
                        .any(|candidate| candidate.id == **dep_id && candidate.status == TodoStatus::Completed)
                })
                .count();
            BlockedItem {
                id: todo.id.clone(),
                title: todo.title.clone(),
                completed_dependencies: completed,
                total_dependencies: todo.dependencies.len(),
            }
        })
        .collect();

    TodoReport {
        generated_at: now,
        timeframe: options.timeframe,
        group_by: options.group_by,
        total: selected.len(),
        groups,
        overdue,
        blocked,
    }
}

/// Start of the reporting window, or `None` for an unbounded report. `today`
/// is local midnight; `week` a rolling 7 days; `month` one calendar month of
/// date arithmetic rather than a fixed 30 days.
fn timeframe_start(timeframe: ReportTimeframe, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match timeframe {
        ReportTimeframe::All => None,
        ReportTimeframe::Today => {
            let midnight = now.with_timezone(&Local).date_naive().and_time(NaiveTime::MIN);
            let start = match midnight.and_local_timezone(Local) {
                LocalResult::Single(value) => value,
                LocalResult::Ambiguous(earliest, _) => earliest,
                LocalResult::None => now.with_timezone(&Local),
            };
            Some(start.with_timezone(&Utc))
        }
        ReportTimeframe::Week => Some(now - Duration::days(7)),
        ReportTimeframe::Month => now.checked_sub_months(Months::new(1)),
    }
}

/// Grouping by tag uses only the record's first tag; untagged records land
/// in a shared bucket.
fn group_key(todo: &Todo, group_by: ReportGroupBy) -> String {
    match group_by {
        ReportGroupBy::Status => todo.status.as_str().to_string(),
        ReportGroupBy::Priority => todo.priority.as_str().to_string(),
        ReportGroupBy::Tag => todo
            .tags
            .first()
            .cloned()
            .unwrap_or_else(|| "untagged".to_string()),
    }
}

fn average_progress(todos: &[Todo]) -> u8 {
    if todos.is_empty() {
        return 0;
    }
    let sum: u64 = todos.iter().map(|todo| u64::from(todo.progress)).sum();
    (sum as f64 / todos.len() as f64).round() as u8
}

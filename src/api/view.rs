//! Presentation helpers: filtering, ordering and the structured tool payload.
//!
//! None of this is stored; it is recomputed for every response.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::widget::Widget;
use crate::models::{parse_due_date, parse_timestamp, timestamp_now, Todo, TodoFilter, TodoStats};

/// A todo as shown to the widget, with its overdue flag.
#[derive(Debug, Serialize)]
pub struct TodoView<'a> {
    #[serde(flatten)]
    pub todo: &'a Todo,
    #[serde(rename = "isOverdue")]
    pub is_overdue: bool,
}

/// Keep the todos matching every criterion set in `filter`.
///
/// The tag criterion matches when the todo carries any of the given tags.
pub fn filter_todos(todos: Vec<Todo>, filter: &TodoFilter, today: NaiveDate) -> Vec<Todo> {
    todos
        .into_iter()
        .filter(|todo| filter.completed.map_or(true, |c| todo.completed == c))
        .filter(|todo| filter.priority.map_or(true, |p| todo.priority == p))
        .filter(|todo| {
            filter
                .overdue
                .map_or(true, |o| todo.is_overdue_on(today) == o)
        })
        .filter(|todo| match filter.tags.as_deref() {
            None | Some([]) => true,
            Some(tags) => tags.iter().any(|tag| todo.tags.contains(tag)),
        })
        .collect()
}

/// Open todos first, then priority high to low, earliest due date (undated
/// last), then newest created.
pub fn sort_todos(todos: &mut [Todo]) {
    todos.sort_by(compare_todos);
}

fn compare_todos(a: &Todo, b: &Todo) -> Ordering {
    let due = |todo: &Todo| {
        let date = todo.due_date.as_deref().and_then(parse_due_date);
        (date.is_none(), date)
    };
    let created = |todo: &Todo| parse_timestamp(&todo.created_at);

    a.completed
        .cmp(&b.completed)
        .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
        .then_with(|| due(a).cmp(&due(b)))
        .then_with(|| created(b).cmp(&created(a)))
}

/// Payload consumed by the todo widget.
pub fn structured_content(
    todos: &[Todo],
    stats: &TodoStats,
    today: NaiveDate,
    extra: Map<String, Value>,
) -> Value {
    let now = timestamp_now();
    let views: Vec<TodoView<'_>> = todos
        .iter()
        .map(|todo| TodoView {
            todo,
            is_overdue: todo.is_overdue_on(today),
        })
        .collect();

    let mut stats_value = json!(stats);
    if let Value::Object(map) = &mut stats_value {
        map.insert("timestamp".to_string(), json!(now));
    }

    let mut content = Map::new();
    content.insert("todos".to_string(), json!(views));
    content.insert("stats".to_string(), stats_value);
    content.insert(
        "metadata".to_string(),
        json!({
            "version": crate::models::SCHEMA_VERSION,
            "widgetType": "todo-management",
            "lastUpdated": now,
            "serverType": "rust",
        }),
    );
    content.extend(extra);
    Value::Object(content)
}

/// Successful tool result carrying text, widget data and widget metadata.
pub fn tool_response(
    text: impl Into<String>,
    todos: &[Todo],
    stats: &TodoStats,
    today: NaiveDate,
    extra: Map<String, Value>,
    widget: &Widget,
) -> Value {
    json!({
        "content": [{ "type": "text", "text": text.into() }],
        "structuredContent": structured_content(todos, stats, today, extra),
        "_meta": widget.meta(),
    })
}

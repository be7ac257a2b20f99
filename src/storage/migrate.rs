//! Structural upgrade of legacy document shapes.
//!
//! Three shapes are recognised, tried in order:
//! 1. the current `{ "todos": [...], "metadata": {...} }` document,
//! 2. a bare array of item-like objects (the oldest format),
//! 3. an object with `todos` but no `metadata`.
//!
//! Matching is purely structural; the stored `version` field is not consulted.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{timestamp_now, Priority, Todo, TodoDocument};

/// Which shape a loaded document was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Current,
    BareArray,
    Unversioned,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Current => "current",
            DocumentFormat::BareArray => "bare-array",
            DocumentFormat::Unversioned => "unversioned",
        }
    }

    /// Whether the document must be rewritten in the current shape.
    pub fn needs_rewrite(&self) -> bool {
        !matches!(self, DocumentFormat::Current)
    }
}

/// A validated document and the shape it was read from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: TodoDocument,
    pub format: DocumentFormat,
}

/// Validate `raw` against the current shape, falling back to the legacy shapes.
pub fn load_document(raw: Value) -> Result<LoadedDocument, AppError> {
    let validation_error = match parse_current(&raw) {
        Ok(document) => {
            return Ok(LoadedDocument {
                document,
                format: DocumentFormat::Current,
            })
        }
        Err(err) => err,
    };

    tracing::warn!(
        "Document validation failed, attempting migration: {}",
        validation_error
    );
    tracing::info!(
        data_type = json_type_name(&raw),
        is_list = raw.is_array(),
        "Attempting data migration"
    );

    let loaded = match raw {
        Value::Array(items) => LoadedDocument {
            document: migrate_bare_array(items)?,
            format: DocumentFormat::BareArray,
        },
        Value::Object(mut map) if map.contains_key("todos") && !map.contains_key("metadata") => {
            let todos = map.remove("todos").unwrap_or(Value::Null);
            LoadedDocument {
                document: migrate_unversioned(todos)?,
                format: DocumentFormat::Unversioned,
            }
        }
        other => {
            let has_keys = match &other {
                Value::Object(map) => json!(map.keys().collect::<Vec<_>>()),
                _ => Value::Null,
            };
            return Err(AppError::validation_with(
                "Unable to migrate todo data - unsupported format",
                json!({
                    "data_type": json_type_name(&other),
                    "has_keys": has_keys,
                    "validation_error": validation_error.message(),
                }),
            ));
        }
    };

    tracing::info!(
        format = loaded.format.as_str(),
        todo_count = loaded.document.todos.len(),
        "Migrated todo data to version {}",
        loaded.document.metadata.version
    );
    Ok(loaded)
}

fn parse_current(raw: &Value) -> Result<TodoDocument, AppError> {
    let document = TodoDocument::deserialize(raw)
        .map_err(|e| AppError::validation(format!("Invalid document: {}", e)))?;
    validate_todos(&document.todos)?;
    Ok(document)
}

/// Per-item checks plus identifier uniqueness.
pub fn validate_todos(todos: &[Todo]) -> Result<(), AppError> {
    let mut seen = std::collections::HashSet::with_capacity(todos.len());
    for todo in todos {
        todo.validate()?;
        if !seen.insert(todo.id.as_str()) {
            return Err(AppError::validation_with(
                format!("Duplicate todo ID {}", todo.id),
                json!({ "todo_id": todo.id }),
            ));
        }
    }
    Ok(())
}

/// Item as found in the oldest format: every field optional, loosely typed.
#[derive(Debug, Default, Deserialize)]
struct LegacyTodo {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: Option<Value>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl LegacyTodo {
    fn into_todo(self) -> Result<Todo, String> {
        let id = match self.id {
            None | Some(Value::Null) => uuid::Uuid::new_v4().to_string(),
            Some(Value::String(id)) => id,
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => return Err(format!("unsupported id type {}", json_type_name(&other))),
        };
        let priority = match self.priority {
            None => Priority::default(),
            Some(raw) => Priority::parse(&raw.to_ascii_lowercase())
                .ok_or_else(|| format!("unknown priority {:?}", raw))?,
        };
        let now = timestamp_now();

        Ok(Todo {
            id,
            title: self.title.unwrap_or_else(|| "Untitled".to_string()),
            description: self.description.unwrap_or_default(),
            completed: self.completed.as_ref().is_some_and(truthy),
            created_at: self.created_at.unwrap_or_else(|| now.clone()),
            updated_at: self.updated_at.unwrap_or(now),
            due_date: self.due_date,
            priority,
            tags: self.tags.unwrap_or_default(),
        })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn migrate_bare_array(items: Vec<Value>) -> Result<TodoDocument, AppError> {
    let original_len = items.len();
    let fail = |reason: String| {
        AppError::validation_with(
            "Failed to migrate array format data",
            json!({ "original_data_length": original_len, "validation_error": reason }),
        )
    };

    let todos = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let legacy: LegacyTodo = match item {
                Value::Object(_) => serde_json::from_value(item)
                    .map_err(|e| format!("item {}: {}", index, e))?,
                other => {
                    return Err(format!(
                        "item {}: expected object, found {}",
                        index,
                        json_type_name(&other)
                    ))
                }
            };
            legacy
                .into_todo()
                .map_err(|reason| format!("item {}: {}", index, reason))
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(fail)?;

    validate_todos(&todos).map_err(|e| fail(e.message()))?;
    Ok(TodoDocument::from_todos(todos))
}

fn migrate_unversioned(raw_todos: Value) -> Result<TodoDocument, AppError> {
    let todo_count = raw_todos.as_array().map(Vec::len).unwrap_or(0);
    let fail = |reason: String| {
        AppError::validation_with(
            "Failed to add metadata to existing todo data",
            json!({ "todo_count": todo_count, "validation_error": reason }),
        )
    };

    let todos: Vec<Todo> = serde_json::from_value(raw_todos).map_err(|e| fail(e.to_string()))?;
    validate_todos(&todos).map_err(|e| fail(e.message()))?;
    Ok(TodoDocument::from_todos(todos))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

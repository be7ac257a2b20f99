//! Todo item model plus the request shapes accepted by the tool facade.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::{parse_due_date, timestamp_now};
use crate::errors::AppError;

/// Todo urgency.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    /// Sort weight, higher is more urgent.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }
}

/// A single todo item as stored in the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "timestamp_now")]
    pub created_at: String,
    #[serde(default = "timestamp_now")]
    pub updated_at: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Todo {
    /// Build a fresh, incomplete todo with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        let now = timestamp_now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            completed: false,
            created_at: now.clone(),
            updated_at: now,
            due_date: None,
            priority: Priority::default(),
            tags: Vec::new(),
        }
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.id.trim().is_empty() {
            return Err(AppError::validation_with(
                "Todo ID cannot be empty",
                serde_json::json!({ "field": "id" }),
            ));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::validation_with(
                "Title cannot be empty",
                serde_json::json!({ "field": "title", "todo_id": self.id }),
            ));
        }
        Ok(())
    }

    /// Open and due strictly before `today`. Unparseable due dates never count.
    pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
        if self.completed {
            return false;
        }
        self.due_date
            .as_deref()
            .and_then(parse_due_date)
            .is_some_and(|due| due < today)
    }
}

/// Partial update merged onto an existing todo.
///
/// `None` leaves a field untouched. For `due_date`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
}

impl TodoPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Names of the fields this patch touches.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.completed.is_some() {
            fields.push("completed");
        }
        if self.due_date.is_some() {
            fields.push("due_date");
        }
        if self.priority.is_some() {
            fields.push("priority");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        fields
    }

    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(description) = self.description {
            todo.description = description;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(tags) = self.tags {
            todo.tags = tags;
        }
    }
}

/// Distinguish an explicit `null` from an absent field.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Arguments of the `create_todo` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl CreateTodoRequest {
    pub fn into_todo(self) -> Todo {
        let mut todo = Todo::new(self.title);
        todo.description = self.description.unwrap_or_default();
        todo.due_date = self.due_date;
        todo.priority = self.priority.unwrap_or_default();
        todo.tags = self.tags.unwrap_or_default();
        todo
    }
}

/// Arguments of the `update_todo` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTodoRequest {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub due_date: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl UpdateTodoRequest {
    pub fn into_parts(self) -> (String, TodoPatch) {
        let patch = TodoPatch {
            title: self.title,
            description: self.description,
            completed: self.completed,
            due_date: self.due_date,
            priority: self.priority,
            tags: self.tags,
        };
        (self.id, patch)
    }
}

/// Arguments of the `complete_todo` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteTodoRequest {
    pub id: String,
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

/// Arguments of the `delete_todo` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteTodoRequest {
    pub id: String,
}

/// Arguments of the `list_todos` tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TodoFilter {
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub overdue: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

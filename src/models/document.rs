//! The persisted todo document and the statistics derived from it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{timestamp_now, Priority, Todo};

/// Schema version written to every saved document.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Document metadata. Counts are derived and refreshed before every save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "timestamp_now")]
    pub last_modified: String,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub completed_count: usize,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            version: default_version(),
            last_modified: timestamp_now(),
            total_count: 0,
            completed_count: 0,
        }
    }
}

/// The root document: items in insertion order plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TodoDocument {
    pub todos: Vec<Todo>,
    pub metadata: DocumentMetadata,
}

impl TodoDocument {
    /// Wrap items in a document with freshly computed metadata.
    pub fn from_todos(todos: Vec<Todo>) -> Self {
        let mut document = Self {
            todos,
            metadata: DocumentMetadata::default(),
        };
        document.refresh_metadata();
        document
    }

    /// Recompute the cached counts and stamp `last_modified`.
    pub fn refresh_metadata(&mut self) {
        self.metadata.total_count = self.todos.len();
        self.metadata.completed_count = self.todos.iter().filter(|t| t.completed).count();
        self.metadata.last_modified = timestamp_now();
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.todos.iter().position(|t| t.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }
}

/// Per-priority item counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl PriorityCounts {
    fn bump(&mut self, priority: Priority) {
        match priority {
            Priority::Low => self.low += 1,
            Priority::Medium => self.medium += 1,
            Priority::High => self.high += 1,
        }
    }

    pub fn get(&self, priority: Priority) -> usize {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }
}

/// Summary statistics over a set of todos.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub overdue: usize,
    pub by_priority: PriorityCounts,
}

impl TodoStats {
    pub fn from_todos<'a>(todos: impl IntoIterator<Item = &'a Todo>, today: NaiveDate) -> Self {
        let mut stats = TodoStats::default();
        for todo in todos {
            stats.total += 1;
            if todo.completed {
                stats.completed += 1;
            }
            if todo.is_overdue_on(today) {
                stats.overdue += 1;
            }
            stats.by_priority.bump(todo.priority);
        }
        stats
    }
}

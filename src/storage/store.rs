//! JSON-file document store for todos.
//!
//! The store is the only owner of the backing file and of the in-memory
//! document. Every mutation is applied to a copy, swapped in, and then the
//! whole document is rewritten to disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::migrate::load_document;
use super::retry::RetryPolicy;
use crate::errors::AppError;
use crate::models::{advance_timestamp, parse_timestamp, Todo, TodoDocument, TodoPatch, TodoStats};

/// Lifecycle of the store. CRUD is only allowed once `Ready`.
#[derive(Debug)]
enum StoreState {
    Uninitialized,
    Initializing,
    Ready(TodoDocument),
}

/// Result of probing the storage directory.
#[derive(Debug, Clone, Serialize)]
pub struct StorageHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Single-file todo store.
pub struct TodoStore {
    file_path: PathBuf,
    read_policy: RetryPolicy,
    write_policy: RetryPolicy,
    state: RwLock<StoreState>,
    /// Serializes mutations so only one writer touches the file at a time.
    write_gate: Mutex<()>,
}

impl TodoStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            read_policy: RetryPolicy::DEFAULT_READ,
            write_policy: RetryPolicy::DEFAULT_WRITE,
            state: RwLock::new(StoreState::Uninitialized),
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_retry_policies(mut self, read: RetryPolicy, write: RetryPolicy) -> Self {
        self.read_policy = read;
        self.write_policy = write;
        self
    }

    /// Path of the backing file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, StoreState::Ready(_))
    }

    /// Load the backing file, creating it when absent.
    ///
    /// Legacy shapes are migrated and written back in the current shape.
    /// Calling this on a ready store is a no-op.
    pub async fn initialize(&self) -> Result<(), AppError> {
        let _gate = self.write_gate.lock().await;
        {
            let mut state = self.state.write().await;
            if let StoreState::Ready(_) = *state {
                tracing::debug!("Todo storage already initialized");
                return Ok(());
            }
            *state = StoreState::Initializing;
        }

        tracing::info!("Initializing todo storage at {:?}", self.file_path);
        let result = self.load_or_create().await;

        let mut state = self.state.write().await;
        match result {
            Ok(document) => {
                tracing::info!(
                    todo_count = document.todos.len(),
                    "Todo storage initialized successfully"
                );
                *state = StoreState::Ready(document);
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to initialize todo storage: {}", err);
                *state = StoreState::Uninitialized;
                Err(err)
            }
        }
    }

    async fn load_or_create(&self) -> Result<TodoDocument, AppError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::storage(
                        "Failed to initialize storage",
                        AppError::file_write("Failed to create storage directory", parent, e),
                    )
                })?;
            }
        }

        let raw = self.read_json(&self.file_path).await.map_err(|e| {
            AppError::storage(format!("Failed to initialize storage: {}", e.message()), e)
        })?;

        let Some(raw) = raw else {
            let mut document = TodoDocument::default();
            document.refresh_metadata();
            let bytes = encode(&document)?;
            self.write_bytes(&bytes).await.map_err(|e| {
                AppError::storage("Failed to create initial storage file", e)
            })?;
            tracing::info!("Created new todo storage file");
            return Ok(document);
        };

        let loaded = load_document(raw)?;
        let mut document = loaded.document;
        if loaded.format.needs_rewrite() {
            self.copy_to_backup().await.map_err(|e| {
                AppError::storage(format!("Failed to initialize storage: {}", e.message()), e)
            })?;
            document.refresh_metadata();
            let bytes = encode(&document)?;
            self.write_bytes(&bytes).await?;
            tracing::info!(
                "Rewrote {} todo data in version {} format",
                loaded.format.as_str(),
                document.metadata.version
            );
        }
        tracing::debug!(
            todo_count = document.todos.len(),
            "Successfully loaded todo data from file"
        );
        Ok(document)
    }

    /// Read and parse a JSON file. `None` means the file does not exist.
    async fn read_json(&self, path: &Path) -> Result<Option<Value>, AppError> {
        self.read_policy
            .run("read", move || async move {
                let content = match tokio::fs::read_to_string(path).await {
                    Ok(content) => content,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                    Err(e) => {
                        return Err(AppError::file_read("Failed to read todos from file", path, e))
                    }
                };
                serde_json::from_str(&content)
                    .map(Some)
                    .map_err(|e| AppError::file_read("Invalid JSON in storage file", path, e))
            })
            .await
    }

    async fn write_bytes(&self, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.file_path.as_path();
        self.write_policy
            .run("write", move || async move {
                tokio::fs::write(path, bytes)
                    .await
                    .map_err(|e| AppError::file_write("Failed to save todos to file", path, e))
            })
            .await
    }

    /// Run `f` against the ready document.
    async fn with_document<T>(&self, f: impl FnOnce(&TodoDocument) -> T) -> Result<T, AppError> {
        match &*self.state.read().await {
            StoreState::Ready(document) => Ok(f(document)),
            StoreState::Uninitialized | StoreState::Initializing => Err(AppError::Uninitialized),
        }
    }

    async fn snapshot(&self) -> Result<TodoDocument, AppError> {
        self.with_document(TodoDocument::clone).await
    }

    /// Swap `next` in as the live document, then persist it.
    ///
    /// Callers must hold the write gate. A failed write leaves memory ahead
    /// of disk until the next successful save; the error says so.
    async fn commit(&self, mut next: TodoDocument) -> Result<(), AppError> {
        next.refresh_metadata();
        let bytes = encode(&next)?;
        let todo_count = next.todos.len();

        *self.state.write().await = StoreState::Ready(next);

        self.write_bytes(&bytes).await.map_err(|e| {
            AppError::storage(
                format!(
                    "Change applied in memory but not persisted to disk: {}",
                    e.message()
                ),
                e,
            )
        })?;
        tracing::debug!(todo_count, "Successfully saved todo data to file");
        Ok(())
    }

    /// All todos in insertion order.
    pub async fn get_all(&self) -> Result<Vec<Todo>, AppError> {
        self.with_document(|document| document.todos.clone()).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Todo>, AppError> {
        self.with_document(|document| document.find(id).cloned())
            .await
    }

    /// Deep copy of the document with up-to-date metadata.
    pub async fn get_document(&self) -> Result<TodoDocument, AppError> {
        let mut document = self.snapshot().await?;
        document.refresh_metadata();
        Ok(document)
    }

    /// Statistics over every stored todo, with overdue judged against today (UTC).
    pub async fn stats(&self) -> Result<TodoStats, AppError> {
        let today = Utc::now().date_naive();
        self.with_document(|document| TodoStats::from_todos(&document.todos, today))
            .await
    }

    /// Append a new todo. Fails on invalid data or a duplicate identifier.
    pub async fn add(&self, todo: Todo) -> Result<Todo, AppError> {
        self.with_document(|_| ()).await?;
        todo.validate().map_err(|e| {
            AppError::validation_with(
                "Invalid todo data",
                serde_json::json!({ "todo_id": todo.id, "validation_error": e.message() }),
            )
        })?;

        let _gate = self.write_gate.lock().await;
        let mut next = self.snapshot().await?;
        if next.find(&todo.id).is_some() {
            return Err(AppError::validation_with(
                format!("Todo with ID {} already exists", todo.id),
                serde_json::json!({ "todo_id": todo.id }),
            ));
        }

        next.todos.push(todo.clone());
        self.commit(next).await?;

        tracing::debug!(todo_id = %todo.id, title = %todo.title, "Added new todo");
        Ok(todo)
    }

    /// Merge `patch` onto an existing todo, keeping its position.
    ///
    /// `updated_at` always advances, even when no field changes.
    pub async fn update(&self, id: &str, patch: TodoPatch) -> Result<Todo, AppError> {
        let _gate = self.write_gate.lock().await;
        let mut next = self.snapshot().await?;
        let index = next
            .position(id)
            .ok_or_else(|| AppError::not_found("todo", id))?;

        let fields = patch.field_names();
        let existing = &next.todos[index];
        let mut updated = existing.clone();
        patch.apply(&mut updated);
        updated.updated_at = advance_timestamp(&existing.updated_at);
        if let (Some(created), Some(touched)) = (
            parse_timestamp(&updated.created_at),
            parse_timestamp(&updated.updated_at),
        ) {
            if created > touched {
                updated.updated_at = updated.created_at.clone();
            }
        }

        updated.validate().map_err(|e| {
            AppError::validation_with(
                "Updated todo data is invalid",
                serde_json::json!({
                    "todo_id": id,
                    "updates": fields,
                    "validation_error": e.message(),
                }),
            )
        })?;

        next.todos[index] = updated.clone();
        self.commit(next).await?;

        tracing::debug!(todo_id = %id, updates = ?fields, "Updated todo");
        Ok(updated)
    }

    /// Remove a todo. Returns `false` without touching the file when absent.
    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let _gate = self.write_gate.lock().await;
        let mut next = self.snapshot().await?;
        let Some(index) = next.position(id) else {
            return Ok(false);
        };

        next.todos.remove(index);
        self.commit(next).await?;

        tracing::debug!(todo_id = %id, "Deleted todo");
        Ok(true)
    }

    /// Remove every todo.
    #[allow(dead_code)]
    pub async fn clear_all(&self) -> Result<(), AppError> {
        let _gate = self.write_gate.lock().await;
        let mut next = self.snapshot().await?;
        next.todos.clear();
        self.commit(next).await
    }

    /// Copy the live file to `<stem>_backup_<timestamp>.json` next to it.
    #[allow(dead_code)]
    pub async fn create_backup(&self) -> Result<PathBuf, AppError> {
        let _gate = self.write_gate.lock().await;
        self.with_document(|_| ()).await?;
        self.copy_to_backup().await
    }

    async fn copy_to_backup(&self) -> Result<PathBuf, AppError> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%6f");
        let stem = self
            .file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("todos");
        let backup_path = self
            .file_path
            .with_file_name(format!("{}_backup_{}.json", stem, timestamp));

        tokio::fs::copy(&self.file_path, &backup_path)
            .await
            .map_err(|e| AppError::backup("Failed to create backup", &self.file_path, e))?;

        tracing::info!("Created todo backup at {:?}", backup_path);
        Ok(backup_path)
    }

    /// Replace the live document with the (possibly legacy) content of a backup.
    #[allow(dead_code)]
    pub async fn restore_from_backup(&self, backup_path: &Path) -> Result<(), AppError> {
        let _gate = self.write_gate.lock().await;
        self.with_document(|_| ()).await?;

        let raw = self.read_json(backup_path).await?.ok_or_else(|| {
            AppError::file_read(
                "Failed to restore from backup",
                backup_path,
                "backup file does not exist",
            )
        })?;
        let loaded = load_document(raw)?;
        let todo_count = loaded.document.todos.len();
        self.commit(loaded.document).await?;

        tracing::info!(
            todo_count,
            format = loaded.format.as_str(),
            "Restored todo data from {:?}",
            backup_path
        );
        Ok(())
    }

    /// Check that the storage directory exists and accepts writes.
    pub async fn check_health(&self) -> StorageHealth {
        let dir = match self.file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let unhealthy = |error: String| StorageHealth {
            healthy: false,
            error: Some(error),
        };

        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return unhealthy(format!(
                    "Storage directory does not exist: {}",
                    dir.display()
                ))
            }
        }

        let probe = dir.join(format!(".health_check_{}", Utc::now().timestamp_micros()));
        if let Err(e) = tokio::fs::write(&probe, b"health check").await {
            return unhealthy(format!("Write test failed: {}", e));
        }
        if let Err(e) = tokio::fs::remove_file(&probe).await {
            return unhealthy(format!("Cleanup of write test failed: {}", e));
        }

        StorageHealth {
            healthy: true,
            error: None,
        }
    }
}

fn encode(document: &TodoDocument) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec_pretty(document)
        .map_err(|e| AppError::Internal(format!("Failed to serialize todo document: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TodoDocument};
    use crate::storage::migrate::DocumentFormat;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    const FAST: RetryPolicy = RetryPolicy::new(2, Duration::from_millis(1));

    fn store_in(dir: &TempDir) -> TodoStore {
        TodoStore::new(dir.path().join("todos.json")).with_retry_policies(FAST, FAST)
    }

    async fn ready_store(dir: &TempDir) -> TodoStore {
        let store = store_in(dir);
        store.initialize().await.unwrap();
        store
    }

    fn sample(title: &str) -> Todo {
        let mut todo = Todo::new(title);
        todo.description = format!("{} description", title);
        todo.priority = Priority::High;
        todo.tags = vec!["home".to_string(), "home".to_string()];
        todo.due_date = Some("2030-01-01".to_string());
        todo
    }

    async fn read_raw(path: &Path) -> Value {
        let content = tokio::fs::read_to_string(path).await.unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[tokio::test]
    async fn test_operations_require_initialize() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(matches!(store.get_all().await, Err(AppError::Uninitialized)));
        assert!(matches!(
            store.get_by_id("x").await,
            Err(AppError::Uninitialized)
        ));
        assert!(matches!(
            store.add(Todo::new("A")).await,
            Err(AppError::Uninitialized)
        ));
        assert!(matches!(
            store.add(Todo::new("   ")).await,
            Err(AppError::Uninitialized)
        ));
        assert!(matches!(
            store.delete("x").await,
            Err(AppError::Uninitialized)
        ));
        assert!(!store.is_ready().await);
    }

    #[tokio::test]
    async fn test_initialize_creates_missing_file_and_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data").join("todos.json");
        let store = TodoStore::new(&path).with_retry_policies(FAST, FAST);

        store.initialize().await.unwrap();

        assert!(store.is_ready().await);
        let raw = read_raw(&path).await;
        assert_eq!(raw["todos"], json!([]));
        assert_eq!(raw["metadata"]["version"], "1.0.0");
        assert_eq!(raw["metadata"]["total_count"], 0);
    }

    #[tokio::test]
    async fn test_add_then_get_by_id() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let todo = sample("Buy milk");

        let stored = store.add(todo.clone()).await.unwrap();
        assert_eq!(stored, todo);

        let fetched = store.get_by_id(&todo.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, todo.title);
        assert_eq!(fetched.description, todo.description);
        assert_eq!(fetched.priority, todo.priority);
        assert_eq!(fetched.tags, todo.tags);
        assert_eq!(fetched.due_date, todo.due_date);
        assert!(store.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_duplicate_id_fails() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let todo = sample("Once");

        store.add(todo.clone()).await.unwrap();
        let err = store.add(todo.clone()).await.unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        let all = store.get_all().await.unwrap();
        assert_eq!(all.iter().filter(|t| t.id == todo.id).count(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_blank_title() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;

        let err = store.add(Todo::new("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        store.add(sample("Keep")).await.unwrap();
        let before = store.get_all().await.unwrap();

        let err = store
            .update("missing", TodoPatch::completion(true))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(store.get_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_advances_timestamp_and_keeps_position() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let first = store.add(sample("First")).await.unwrap();
        let second = store.add(sample("Second")).await.unwrap();

        let unchanged = store
            .update(&first.id, TodoPatch::default())
            .await
            .unwrap();
        assert!(
            parse_timestamp(&unchanged.updated_at).unwrap()
                >= parse_timestamp(&first.updated_at).unwrap()
        );
        assert_eq!(unchanged.created_at, first.created_at);

        let patch = TodoPatch {
            title: Some("First, renamed".to_string()),
            due_date: Some(None),
            ..TodoPatch::default()
        };
        let renamed = store.update(&first.id, patch).await.unwrap();
        assert_eq!(renamed.title, "First, renamed");
        assert_eq!(renamed.due_date, None);
        assert_eq!(renamed.description, first.description);

        let all = store.get_all().await.unwrap();
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);
    }

    #[tokio::test]
    async fn test_update_to_blank_title_fails() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let todo = store.add(sample("Named")).await.unwrap();

        let patch = TodoPatch {
            title: Some("".to_string()),
            ..TodoPatch::default()
        };
        let err = store.update(&todo.id, patch).await.unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        let stored = store.get_by_id(&todo.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Named");
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let todo = store.add(sample("Gone soon")).await.unwrap();

        assert!(store.delete(&todo.id).await.unwrap());
        assert!(store.get_by_id(&todo.id).await.unwrap().is_none());
        assert!(!store.delete(&todo.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let mut done = sample("Done");
        done.completed = true;
        store.add(sample("Open")).await.unwrap();
        store.add(done).await.unwrap();
        let saved = store.get_document().await.unwrap();

        let reopened = ready_store(&dir).await;
        let loaded = reopened.get_document().await.unwrap();

        assert_eq!(loaded.todos, saved.todos);
        assert_eq!(loaded.metadata.total_count, 2);
        assert_eq!(loaded.metadata.completed_count, 1);
        assert_eq!(loaded.metadata.version, saved.metadata.version);
    }

    #[tokio::test]
    async fn test_bare_array_is_migrated_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("todos.json");
        tokio::fs::write(&path, r#"[{"title":"A"}]"#).await.unwrap();

        let store = ready_store(&dir).await;
        let todos = store.get_all().await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "A");
        assert_eq!(todos[0].priority, Priority::Medium);
        assert_eq!(store.get_document().await.unwrap().metadata.total_count, 1);

        let raw = read_raw(&path).await;
        assert_eq!(raw["metadata"]["total_count"], 1);
        let reloaded = load_document(raw).unwrap();
        assert_eq!(reloaded.format, DocumentFormat::Current);

        let reopened = ready_store(&dir).await;
        assert_eq!(reopened.get_all().await.unwrap()[0].id, todos[0].id);

        let mut backups = 0;
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().starts_with("todos_backup_") {
                backups += 1;
            }
        }
        assert_eq!(backups, 1);
    }

    #[tokio::test]
    async fn test_failed_legacy_backup_fails_initialize() {
        let dir = TempDir::new().unwrap();
        // The file name fits, but the backup name exceeds the filesystem limit.
        let path = dir.path().join(format!("{}.json", "t".repeat(240)));
        tokio::fs::write(&path, r#"[{"title":"A"}]"#).await.unwrap();

        let store = TodoStore::new(&path).with_retry_policies(FAST, FAST);
        let err = store.initialize().await.unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.message().starts_with("Failed to initialize storage"));
        assert!(!store.is_ready().await);
        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            r#"[{"title":"A"}]"#
        );
    }

    #[tokio::test]
    async fn test_unsupported_shape_fails_initialize() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("todos.json"), r#"{"foo": 1}"#)
            .await
            .unwrap();

        let store = store_in(&dir);
        let err = store.initialize().await.unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert!(!store.is_ready().await);
    }

    #[tokio::test]
    async fn test_corrupt_json_fails_initialize_after_retries() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("todos.json"), "{ not json")
            .await
            .unwrap();

        let store = store_in(&dir);
        let err = store.initialize().await.unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(matches!(store.get_all().await, Err(AppError::Uninitialized)));
    }

    #[tokio::test]
    async fn test_failed_save_reports_divergence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("todos.json");
        let store = ready_store(&dir).await;

        // A directory where the file should be makes every write fail.
        tokio::fs::remove_file(&path).await.unwrap();
        tokio::fs::create_dir(&path).await.unwrap();

        let todo = sample("Unsaved");
        let err = store.add(todo.clone()).await.unwrap_err();

        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert!(err.message().contains("not persisted"));
        assert!(store.get_by_id(&todo.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_backup_and_restore() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let kept = store.add(sample("Kept")).await.unwrap();

        let backup = store.create_backup().await.unwrap();
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("todos_backup_"));
        assert!(name.ends_with(".json"));
        assert!(!name.trim_end_matches(".json").contains(':'));

        store.add(sample("Added later")).await.unwrap();
        store.restore_from_backup(&backup).await.unwrap();

        let todos = store.get_all().await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].id, kept.id);

        let raw = read_raw(store.file_path()).await;
        assert_eq!(raw["metadata"]["total_count"], 1);
    }

    #[tokio::test]
    async fn test_restore_migrates_legacy_backup() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let legacy = dir.path().join("legacy.json");
        tokio::fs::write(&legacy, r#"{"todos":[{"id":"l1","title":"Legacy"}]}"#)
            .await
            .unwrap();

        store.restore_from_backup(&legacy).await.unwrap();

        let todos = store.get_all().await.unwrap();
        assert_eq!(todos[0].id, "l1");
        let raw = read_raw(store.file_path()).await;
        assert!(raw["metadata"].is_object());
    }

    #[tokio::test]
    async fn test_restore_rejects_missing_and_invalid_backups() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        store.add(sample("Survivor")).await.unwrap();

        let missing = store
            .restore_from_backup(&dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert_eq!(missing.error_code(), "FILE_READ_ERROR");

        let invalid = dir.path().join("invalid.json");
        tokio::fs::write(&invalid, r#"{"foo": 1}"#).await.unwrap();
        let err = store.restore_from_backup(&invalid).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_all_and_stats() {
        let dir = TempDir::new().unwrap();
        let store = ready_store(&dir).await;
        let mut overdue = sample("Late");
        overdue.due_date = Some("2000-01-01".to_string());
        store.add(overdue).await.unwrap();
        store.add(Todo::new("Plain")).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.by_priority.high, 1);

        store.clear_all().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
        let raw = read_raw(store.file_path()).await;
        let on_disk: TodoDocument = serde_json::from_value(raw).unwrap();
        assert!(on_disk.todos.is_empty());
    }

    #[tokio::test]
    async fn test_check_health() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.check_health().await.healthy);

        let missing = TodoStore::new(dir.path().join("absent").join("todos.json"));
        let health = missing.check_health().await;
        assert!(!health.healthy);
        assert!(health.error.unwrap().contains("does not exist"));
    }
}

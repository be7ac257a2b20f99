//! Todo tools exposed through `tools/list` and `tools/call`.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::view::{filter_todos, sort_todos, tool_response};
use crate::errors::{AppError, ErrorResponse};
use crate::models::{
    parse_due_date, CompleteTodoRequest, CreateTodoRequest, DeleteTodoRequest, Priority, TodoFilter,
    TodoPatch, TodoStats, UpdateTodoRequest,
};
use crate::AppState;

/// The tools this server offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ListTodos,
    CreateTodo,
    UpdateTodo,
    CompleteTodo,
    DeleteTodo,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::ListTodos,
        Tool::CreateTodo,
        Tool::UpdateTodo,
        Tool::CompleteTodo,
        Tool::DeleteTodo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::ListTodos => "list_todos",
            Tool::CreateTodo => "create_todo",
            Tool::UpdateTodo => "update_todo",
            Tool::CompleteTodo => "complete_todo",
            Tool::DeleteTodo => "delete_todo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            Tool::ListTodos => {
                "List todos, optionally filtered by completion, priority, overdue status, or tags"
            }
            Tool::CreateTodo => {
                "Create a todo with a title and optional description, due date, priority, and tags"
            }
            Tool::UpdateTodo => "Update an existing todo item by ID with new values for any field",
            Tool::CompleteTodo => "Mark a todo as completed or incomplete by ID",
            Tool::DeleteTodo => "Delete a todo item by ID",
        }
    }

    fn input_schema(&self) -> Value {
        let priority = json!({
            "type": "string",
            "enum": Priority::ALL.map(|p| p.as_str()),
        });
        let tags = json!({ "type": "array", "items": { "type": "string" } });
        let id = json!({ "type": "string", "description": "Todo ID" });
        let due_date = json!({
            "type": ["string", "null"],
            "description": "ISO-8601 date (YYYY-MM-DD) or date-time",
        });

        match self {
            Tool::ListTodos => json!({
                "type": "object",
                "properties": {
                    "completed": { "type": "boolean" },
                    "priority": priority,
                    "overdue": { "type": "boolean" },
                    "tags": tags,
                },
            }),
            Tool::CreateTodo => json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "due_date": due_date,
                    "priority": priority,
                    "tags": tags,
                },
                "required": ["title"],
            }),
            Tool::UpdateTodo => json!({
                "type": "object",
                "properties": {
                    "id": id,
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "due_date": due_date,
                    "priority": priority,
                    "completed": { "type": "boolean" },
                    "tags": tags,
                },
                "required": ["id"],
            }),
            Tool::CompleteTodo => json!({
                "type": "object",
                "properties": {
                    "id": id,
                    "completed": { "type": "boolean", "default": true },
                },
                "required": ["id"],
            }),
            Tool::DeleteTodo => json!({
                "type": "object",
                "properties": { "id": id },
                "required": ["id"],
            }),
        }
    }

    fn definition(&self, state: &AppState) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
            "_meta": state.widget.meta(),
        })
    }
}

/// `tools/list` result.
pub fn list_tools(state: &AppState) -> Value {
    let tools: Vec<Value> = Tool::ALL.iter().map(|t| t.definition(state)).collect();
    json!({ "tools": tools })
}

/// Run a tool. Failures become `isError` results rather than protocol errors.
pub async fn call_tool(state: &AppState, tool: Tool, arguments: Value) -> Value {
    let request_id = state.request_ids.next();
    tracing::debug!(request_id = %request_id, tool = tool.name(), "Handling tool call");

    let result = match tool {
        Tool::ListTodos => list_todos(state, &request_id, arguments).await,
        Tool::CreateTodo => create_todo(state, &request_id, arguments).await,
        Tool::UpdateTodo => update_todo(state, &request_id, arguments).await,
        Tool::CompleteTodo => complete_todo(state, &request_id, arguments).await,
        Tool::DeleteTodo => delete_todo(state, &request_id, arguments).await,
    };

    result.unwrap_or_else(|err| tool_error_response(&err, tool.name(), &request_id))
}

fn tool_error_response(error: &AppError, tool_name: &str, request_id: &str) -> Value {
    tracing::error!(
        request_id = %request_id,
        tool = tool_name,
        code = error.error_code(),
        "Error occurred: {}",
        error
    );
    let response = ErrorResponse::new(error, Some(request_id));
    json!({
        "content": [{
            "type": "text",
            "text": format!("Error in {}: {}", tool_name, response.message),
        }],
        "isError": true,
        "_meta": {
            "error": response,
            "tool_name": tool_name,
            "request_id": request_id,
        },
    })
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, AppError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    Ok(serde_json::from_value(arguments)?)
}

fn require_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::validation_with(
            "Title cannot be empty",
            json!({ "field": "title" }),
        ));
    }
    Ok(())
}

fn require_id(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::validation_with(
            "Todo ID is required and must be a string",
            json!({ "field": "id" }),
        ));
    }
    Ok(())
}

fn check_due_date(due_date: Option<&str>) -> Result<(), AppError> {
    match due_date {
        Some(raw) if parse_due_date(raw).is_none() => Err(AppError::validation_with(
            format!("Invalid due date {:?}: expected an ISO-8601 date", raw),
            json!({ "field": "due_date" }),
        )),
        _ => Ok(()),
    }
}

/// Full sorted list plus stats for the widget after a change.
async fn refreshed_response(
    state: &AppState,
    text: String,
    extra: Map<String, Value>,
) -> Result<Value, AppError> {
    let today = Utc::now().date_naive();
    let mut todos = state.store.get_all().await?;
    sort_todos(&mut todos);
    let stats = TodoStats::from_todos(&todos, today);
    Ok(tool_response(text, &todos, &stats, today, extra, &state.widget))
}

fn payload(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

async fn list_todos(
    state: &AppState,
    request_id: &str,
    arguments: Value,
) -> Result<Value, AppError> {
    let filter: TodoFilter = parse_args(arguments)?;
    let today = Utc::now().date_naive();

    let mut todos = filter_todos(state.store.get_all().await?, &filter, today);
    sort_todos(&mut todos);
    let stats = TodoStats::from_todos(&todos, today);

    let mut text = format!("Found {} todo(s)", todos.len());
    if stats.completed > 0 {
        text.push_str(&format!(" ({} completed)", stats.completed));
    }
    if stats.overdue > 0 {
        text.push_str(&format!(" ({} overdue)", stats.overdue));
    }

    tracing::info!(
        request_id = %request_id,
        count = todos.len(),
        "Successfully listed todos"
    );
    let extra = payload([("filter", json!(filter))]);
    Ok(tool_response(text, &todos, &stats, today, extra, &state.widget))
}

async fn create_todo(
    state: &AppState,
    request_id: &str,
    arguments: Value,
) -> Result<Value, AppError> {
    let request: CreateTodoRequest = parse_args(arguments)?;
    require_title(&request.title)?;
    check_due_date(request.due_date.as_deref())?;

    let todo = state.store.add(request.into_todo()).await?;

    tracing::info!(
        request_id = %request_id,
        todo_id = %todo.id,
        title = %todo.title,
        "Successfully created todo"
    );
    let text = format!("Created todo: \"{}\"", todo.title);
    let extra = payload([("action", json!("create")), ("createdTodo", json!(todo))]);
    refreshed_response(state, text, extra).await
}

async fn update_todo(
    state: &AppState,
    request_id: &str,
    arguments: Value,
) -> Result<Value, AppError> {
    let request: UpdateTodoRequest = parse_args(arguments)?;
    let (id, patch) = request.into_parts();
    require_id(&id)?;

    if state.store.get_by_id(&id).await?.is_none() {
        return Err(AppError::not_found("todo", &id));
    }
    if let Some(title) = &patch.title {
        require_title(title)?;
    }
    if let Some(due_date) = &patch.due_date {
        check_due_date(due_date.as_deref())?;
    }

    let fields = patch.field_names();
    let updated = state.store.update(&id, patch).await?;

    tracing::info!(
        request_id = %request_id,
        todo_id = %id,
        updates = ?fields,
        "Successfully updated todo"
    );
    let text = format!("Updated todo: \"{}\"", updated.title);
    let extra = payload([("action", json!("update")), ("updatedTodo", json!(updated))]);
    refreshed_response(state, text, extra).await
}

async fn complete_todo(
    state: &AppState,
    request_id: &str,
    arguments: Value,
) -> Result<Value, AppError> {
    let request: CompleteTodoRequest = parse_args(arguments)?;
    require_id(&request.id)?;

    if state.store.get_by_id(&request.id).await?.is_none() {
        return Err(AppError::not_found("todo", &request.id));
    }

    let updated = state
        .store
        .update(&request.id, TodoPatch::completion(request.completed))
        .await?;

    tracing::info!(
        request_id = %request_id,
        todo_id = %request.id,
        completed = request.completed,
        "Successfully updated todo completion status"
    );
    let action = if request.completed {
        "completed"
    } else {
        "marked as incomplete"
    };
    let text = format!("Todo \"{}\" {}", updated.title, action);
    let extra = payload([
        ("action", json!("complete")),
        ("updatedTodo", json!(updated)),
        ("completed", json!(request.completed)),
    ]);
    refreshed_response(state, text, extra).await
}

async fn delete_todo(
    state: &AppState,
    request_id: &str,
    arguments: Value,
) -> Result<Value, AppError> {
    let request: DeleteTodoRequest = parse_args(arguments)?;
    require_id(&request.id)?;

    let Some(todo) = state.store.get_by_id(&request.id).await? else {
        return Err(AppError::not_found("todo", &request.id));
    };

    if !state.store.delete(&request.id).await? {
        return Err(AppError::Storage {
            message: format!("Failed to delete todo with ID {}", request.id),
            attempts: None,
            source: None,
        });
    }

    tracing::info!(
        request_id = %request_id,
        todo_id = %request.id,
        title = %todo.title,
        "Successfully deleted todo"
    );
    let text = format!("Deleted todo: \"{}\"", todo.title);
    let extra = payload([("action", json!("delete")), ("deletedTodo", json!(todo))]);
    refreshed_response(state, text, extra).await
}

//! Widget and data resources served through `resources/*`.

use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};

use super::view::sort_todos;
use super::widget::{locate_asset, mime_type};
use crate::errors::AppError;
use crate::models::{timestamp_now, TodoStats};
use crate::AppState;

const DATA_URI: &str = "ui://data/todos.json";
const ASSET_PREFIX: &str = "ui://assets/";

/// `resources/list` result.
pub fn list_resources(state: &AppState) -> Value {
    let widget = &state.widget;
    json!({
        "resources": [
            {
                "uri": widget.template_uri,
                "name": widget.id,
                "title": widget.title,
                "description": "Interactive todo management widget",
                "mimeType": "text/html",
                "_meta": widget.meta(),
            },
            {
                "uri": DATA_URI,
                "name": "todo-data",
                "title": "Todo Data",
                "description": "Current todo list with statistics",
                "mimeType": "application/json",
            },
            {
                "uri": format!("{}todo.js", ASSET_PREFIX),
                "name": "todo-widget-script",
                "title": "Todo Widget Script",
                "mimeType": "application/javascript",
            },
            {
                "uri": format!("{}todo.css", ASSET_PREFIX),
                "name": "todo-widget-styles",
                "title": "Todo Widget Styles",
                "mimeType": "text/css",
            },
        ],
    })
}

/// `resources/templates/list` result.
pub fn list_resource_templates() -> Value {
    json!({
        "resourceTemplates": [{
            "uriTemplate": format!("{}{{filename}}", ASSET_PREFIX),
            "name": "widget-assets",
            "title": "Widget Assets",
            "description": "Static files from the widget assets directory",
        }],
    })
}

/// `resources/read` result for `uri`.
pub async fn read_resource(state: &AppState, uri: &str) -> Result<Value, AppError> {
    let (mime, text) = if uri == state.widget.template_uri {
        ("text/html", state.widget.html.clone())
    } else if uri == DATA_URI {
        ("application/json", todo_data(state).await?)
    } else if let Some(filename) = uri.strip_prefix(ASSET_PREFIX) {
        read_asset(&state.config.assets_dir, filename).await?
    } else {
        return Err(AppError::not_found("resource", uri));
    };

    Ok(json!({
        "contents": [{
            "uri": uri,
            "mimeType": mime,
            "text": text,
        }],
    }))
}

async fn todo_data(state: &AppState) -> Result<String, AppError> {
    let document = state.store.get_document().await?;
    let stats = TodoStats::from_todos(&document.todos, Utc::now().date_naive());
    let mut todos = document.todos;
    sort_todos(&mut todos);

    let data = json!({
        "todos": todos,
        "stats": stats,
        "timestamp": timestamp_now(),
    });
    serde_json::to_string_pretty(&data)
        .map_err(|e| AppError::Internal(format!("Failed to serialize todo data: {}", e)))
}

async fn read_asset(assets_dir: &Path, filename: &str) -> Result<(&'static str, String), AppError> {
    let path =
        locate_asset(assets_dir, filename).ok_or_else(|| AppError::not_found("asset", filename))?;

    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| AppError::file_read("Failed to read asset", &path, e))?;

    tracing::debug!("Serving asset {:?}", path);
    Ok((mime_type(&path), text))
}

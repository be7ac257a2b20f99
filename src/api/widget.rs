//! Todo widget configuration and static asset lookup.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

const FALLBACK_HTML: &str = "<div>Todo widget loading...</div>";
const MISSING_ASSETS_HTML: &str = "<div>Todo widget not available - assets not built</div>";

/// The HTML widget rendered by the client next to tool results.
#[derive(Debug, Clone)]
pub struct Widget {
    pub id: String,
    pub title: String,
    pub template_uri: String,
    pub invoking: String,
    pub invoked: String,
    pub html: String,
}

impl Widget {
    /// Load the widget template from `assets_dir`, falling back to a placeholder.
    pub fn load(assets_dir: &Path) -> Self {
        Self {
            id: "todo-widget".to_string(),
            title: "Todo Management Widget".to_string(),
            template_uri: "ui://widget/todo.html".to_string(),
            invoking: "Managing your todos...".to_string(),
            invoked: "Todo list updated successfully!".to_string(),
            html: read_widget_html(assets_dir, "todo"),
        }
    }

    /// Tool-result metadata pointing the client at this widget.
    pub fn meta(&self) -> Value {
        json!({
            "openai/outputTemplate": self.template_uri,
            "openai/toolInvocation/invoking": self.invoking,
            "openai/toolInvocation/invoked": self.invoked,
            "openai/widgetAccessible": true,
            "openai/resultCanProduceWidget": true,
        })
    }
}

fn read_widget_html(assets_dir: &Path, component: &str) -> String {
    if !assets_dir.is_dir() {
        tracing::warn!(
            "Widget assets not found at {:?}. Widget functionality will be limited.",
            assets_dir
        );
        return MISSING_ASSETS_HTML.to_string();
    }

    let Some(path) = locate_asset(assets_dir, &format!("{}.html", component)) else {
        tracing::warn!(
            "Widget HTML for {:?} not found in {:?}. Using fallback.",
            component,
            assets_dir
        );
        return FALLBACK_HTML.to_string();
    };

    match std::fs::read_to_string(&path) {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Failed to read widget HTML {:?}: {}", path, e);
            FALLBACK_HTML.to_string()
        }
    }
}

/// Find `filename` in `dir`, or failing that the latest versioned build of it
/// (`todo.js` matches `todo-3f2a1c.js`). Names with path components are refused.
pub fn locate_asset(dir: &Path, filename: &str) -> Option<PathBuf> {
    if filename.is_empty()
        || filename.contains(|c: char| c == '/' || c == '\\')
        || filename.contains("..")
        || filename.starts_with('.')
    {
        return None;
    }

    let direct = dir.join(filename);
    if direct.is_file() {
        return Some(direct);
    }

    let requested = Path::new(filename);
    let stem = requested.file_stem()?.to_str()?;
    let extension = requested
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let prefix = format!("{}-", stem);

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(&extension))
        })
        .collect();
    candidates.sort();
    candidates.pop()
}

/// MIME type by file extension.
pub fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("html") => "text/html",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_direct_and_versioned() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("todo.css"), "body {}").unwrap();
        std::fs::write(dir.path().join("todo-aaa111.js"), "old").unwrap();
        std::fs::write(dir.path().join("todo-bbb222.js"), "new").unwrap();

        assert_eq!(
            locate_asset(dir.path(), "todo.css"),
            Some(dir.path().join("todo.css"))
        );
        assert_eq!(
            locate_asset(dir.path(), "todo.js"),
            Some(dir.path().join("todo-bbb222.js"))
        );
        assert_eq!(locate_asset(dir.path(), "other.js"), None);
    }

    #[test]
    fn test_locate_refuses_traversal() {
        let dir = TempDir::new().unwrap();
        assert_eq!(locate_asset(dir.path(), "../secret.txt"), None);
        assert_eq!(locate_asset(dir.path(), "nested/todo.js"), None);
        assert_eq!(locate_asset(dir.path(), ".env"), None);
    }

    #[test]
    fn test_widget_falls_back_without_assets() {
        let dir = TempDir::new().unwrap();
        let widget = Widget::load(&dir.path().join("missing"));
        assert_eq!(widget.html, MISSING_ASSETS_HTML);

        let widget = Widget::load(dir.path());
        assert_eq!(widget.html, FALLBACK_HTML);

        std::fs::write(dir.path().join("todo-1234.html"), "<div id=\"root\"></div>").unwrap();
        let widget = Widget::load(dir.path());
        assert_eq!(widget.html, "<div id=\"root\"></div>");
        assert_eq!(widget.meta()["openai/outputTemplate"], "ui://widget/todo.html");
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type(Path::new("a.JS")), "application/javascript");
        assert_eq!(mime_type(Path::new("a.css")), "text/css");
        assert_eq!(mime_type(Path::new("a.bin")), "application/octet-stream");
    }
}

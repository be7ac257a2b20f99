//! Error handling module for the todo server.
//!
//! Provides the centralized error type with machine-readable codes, HTTP-style
//! status codes and the structured envelope handed to tool callers.

use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const UNINITIALIZED: &str = "UNINITIALIZED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const TODO_NOT_FOUND: &str = "TODO_NOT_FOUND";
    pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const FILE_READ_ERROR: &str = "FILE_READ_ERROR";
    pub const FILE_WRITE_ERROR: &str = "FILE_WRITE_ERROR";
    pub const BACKUP_ERROR: &str = "BACKUP_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// A store operation ran before `initialize()` completed
    Uninitialized,
    /// Bad input shape or values, including failed migrations
    Validation {
        message: String,
        details: Option<Value>,
    },
    /// An operation referenced an unknown identifier
    NotFound { resource: String, id: String },
    /// Reading or parsing a file failed
    FileRead {
        message: String,
        path: PathBuf,
        cause: String,
    },
    /// Writing a file failed
    FileWrite {
        message: String,
        path: PathBuf,
        cause: String,
    },
    /// Copying the live document to a backup failed
    Backup {
        message: String,
        path: PathBuf,
        cause: String,
    },
    /// Generic storage failure, including retry exhaustion
    Storage {
        message: String,
        attempts: Option<u32>,
        source: Option<Box<AppError>>,
    },
    /// Internal server error
    Internal(String),
    /// Malformed request arguments
    BadRequest(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: Value) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    pub fn file_read(message: impl Into<String>, path: &Path, cause: impl ToString) -> Self {
        AppError::FileRead {
            message: message.into(),
            path: path.to_path_buf(),
            cause: cause.to_string(),
        }
    }

    pub fn file_write(message: impl Into<String>, path: &Path, cause: impl ToString) -> Self {
        AppError::FileWrite {
            message: message.into(),
            path: path.to_path_buf(),
            cause: cause.to_string(),
        }
    }

    pub fn backup(message: impl Into<String>, path: &Path, cause: impl ToString) -> Self {
        AppError::Backup {
            message: message.into(),
            path: path.to_path_buf(),
            cause: cause.to_string(),
        }
    }

    /// Wrap an underlying failure into a storage error.
    pub fn storage(message: impl Into<String>, source: AppError) -> Self {
        AppError::Storage {
            message: message.into(),
            attempts: None,
            source: Some(Box::new(source)),
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Validation and not-found failures are deterministic for the same input.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AppError::Validation { .. } | AppError::NotFound { .. })
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Uninitialized
            | AppError::FileRead { .. }
            | AppError::FileWrite { .. }
            | AppError::Backup { .. }
            | AppError::Storage { .. }
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Uninitialized => codes::UNINITIALIZED,
            AppError::Validation { .. } => codes::VALIDATION_ERROR,
            AppError::NotFound { resource, .. } if resource == "todo" => codes::TODO_NOT_FOUND,
            AppError::NotFound { .. } => codes::RESOURCE_NOT_FOUND,
            AppError::FileRead { .. } => codes::FILE_READ_ERROR,
            AppError::FileWrite { .. } => codes::FILE_WRITE_ERROR,
            AppError::Backup { .. } => codes::BACKUP_ERROR,
            AppError::Storage { .. } => codes::STORAGE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
            AppError::BadRequest(_) => codes::INVALID_INPUT,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Uninitialized => {
                "Storage not initialized. Call initialize() first.".to_string()
            }
            AppError::Validation { message, .. } => message.clone(),
            AppError::NotFound { resource, id } => format!("{} not found: {}", resource, id),
            AppError::FileRead { message, cause, .. }
            | AppError::FileWrite { message, cause, .. }
            | AppError::Backup { message, cause, .. } => format!("{}: {}", message, cause),
            AppError::Storage { message, .. } => message.clone(),
            AppError::Internal(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }

    /// Structured diagnostic detail attached to the error, if any.
    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::Validation { details, .. } => details.clone(),
            AppError::NotFound { resource, id } => {
                Some(json!({ "resource": resource, "identifier": id }))
            }
            AppError::FileRead { path, cause, .. } => Some(file_details("read", path, cause)),
            AppError::FileWrite { path, cause, .. } => Some(file_details("write", path, cause)),
            AppError::Backup { path, cause, .. } => Some(file_details("backup", path, cause)),
            AppError::Storage {
                attempts, source, ..
            } => {
                let mut details = serde_json::Map::new();
                if let Some(attempts) = attempts {
                    details.insert("attempts".to_string(), json!(attempts));
                }
                if let Some(source) = source {
                    details.insert(
                        "original_error".to_string(),
                        json!({
                            "code": source.error_code(),
                            "message": source.message(),
                            "details": source.details(),
                        }),
                    );
                }
                (!details.is_empty()).then_some(Value::Object(details))
            }
            AppError::Uninitialized | AppError::Internal(_) | AppError::BadRequest(_) => None,
        }
    }
}

fn file_details(operation: &str, path: &Path, cause: &str) -> Value {
    json!({
        "operation": operation,
        "file_path": path.display().to_string(),
        "original_error": cause,
    })
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Storage {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("JSON error: {:?}", err);
        AppError::BadRequest(format!("Invalid arguments: {}", err))
    }
}

/// Structured error envelope handed to tool callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
    pub code: String,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &AppError, request_id: Option<&str>) -> Self {
        Self {
            error: true,
            message: error.message(),
            code: error.error_code().to_string(),
            status_code: error.status_code().as_u16(),
            details: error.details(),
            timestamp: Utc::now().to_rfc3339(),
            request_id: request_id.map(str::to_string),
        }
    }
}

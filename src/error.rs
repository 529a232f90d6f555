//! Unified application error model and mapping helpers.
//! Services and stores return `AppError`; the HTTP layer turns it into a status
//! code plus the `{statusCode, message, error}` body clients already expect.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, messages: Vec<String> },
    Duplicate { code: String, message: String },
    NotFound { code: String, message: String },
    Auth { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::Duplicate { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    /// First (or only) human-readable message.
    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { messages, .. } => messages.first().map(String::as_str).unwrap_or("invalid input"),
            AppError::Duplicate { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), messages: vec![msg.into()] } }
    pub fn validation(messages: Vec<String>) -> Self { AppError::UserInput { code: "validation_failed".into(), messages } }
    pub fn duplicate<S: Into<String>>(code: S, msg: S) -> Self { AppError::Duplicate { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn io<S: Into<String>>(code: S, msg: S) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::Duplicate { .. } => 409,
            AppError::NotFound { .. } => 404,
            AppError::Auth { .. } => 401,
            AppError::Io { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }

    /// Response body in the `{statusCode, message, error}` shape.
    /// Validation failures keep the full list of messages.
    pub fn to_body(&self) -> serde_json::Value {
        let status = self.http_status();
        let message = match self {
            AppError::UserInput { messages, .. } if messages.len() != 1 => serde_json::json!(messages),
            _ => serde_json::json!(self.message()),
        };
        serde_json::json!({
            "statusCode": status,
            "message": message,
            "error": reason_phrase(status),
        })
    }
}

/// Canonical reason phrase used in the `error` field of response bodies.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        409 => "Conflict",
        503 => "Service Unavailable",
        _ => "Internal Server Error",
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::UserInput { code, messages } => write!(f, "{}: {}", code, messages.join("; ")),
            _ => write!(f, "{}: {}", self.code_str(), self.message()),
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless downcasted elsewhere
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(other) => AppError::Internal { code: "internal_error".into(), message: other.to_string() },
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { code: "store_io".into(), message: err.to_string() }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal { code: "store_corrupt".into(), message: err.to_string() }
    }
}

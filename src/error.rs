//! Error types for taskchat
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, not logged in, duplicates, bad credentials)
//! - 3: A command named an entity that does not exist
//! - 4: Operation failed (store, IO, classifier)

use std::path::PathBuf;
use thiserror::Error;

use crate::model::EntityKind;

/// Exit codes for the taskchat CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const UNRESOLVED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskchat operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No matching record found")]
    NoRecord,

    #[error("Name already exists: {0}")]
    DuplicateName(String),

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    /// A uniqueness violation on insert. The dispatcher recovers from this by
    /// re-resolving the name.
    #[error("{kind} already exists: {name}")]
    Duplicate { kind: EntityKind, name: String },

    // Unresolved names in commands that require them (exit code 3)
    #[error("{kind} not found: {name}")]
    Unresolved { kind: EntityKind, name: String },

    // Operation failures (exit code 4)
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::InvalidIntent(_)
            | Error::NotAuthenticated
            | Error::InvalidCredentials
            | Error::NoRecord
            | Error::DuplicateName(_)
            | Error::DuplicateEmail(_)
            | Error::Duplicate { .. } => exit_codes::USER_ERROR,

            Error::Unresolved { .. } => exit_codes::UNRESOLVED,

            // Operation failures
            Error::Sql(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::Classifier(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Soft failures keep the conversation going; everything else ends the
    /// request.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::InvalidCredentials
                | Error::NoRecord
                | Error::DuplicateName(_)
                | Error::DuplicateEmail(_)
        )
    }

    /// Structured details for the JSON error envelope
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Duplicate { kind, name } | Error::Unresolved { kind, name } => {
                Some(serde_json::json!({ "kind": kind, "name": name }))
            }
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }
}

/// Result type alias for taskchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}

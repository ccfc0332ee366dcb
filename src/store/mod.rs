//! Persistence for projects, tasks, comments, attachments and users.
//!
//! `TaskStore` is the set of mutation primitives plus name resolution that the
//! command dispatcher drives. `SqliteStore` implements it on top of SQLite and
//! additionally serves user accounts and the join query behind the project
//! view.

mod join;
mod mutations;
mod schema;
mod users;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{ffi, Connection, ErrorCode};

use crate::error::{Error, Result};
use crate::model::{
    AttachmentId, CommentId, EntityKind, ProjectId, TaskId, UserId,
};

/// Mutation primitives and name resolution consumed by the dispatcher.
///
/// Inserts report a uniqueness violation as [`Error::Duplicate`]; every other
/// failure is returned as-is.
pub trait TaskStore {
    /// Case-insensitive exact-match lookup. `None` unless exactly one entity
    /// of `kind` carries `name`.
    fn resolve(&self, kind: EntityKind, name: &str) -> Result<Option<i64>>;

    fn insert_project(
        &self,
        name: &str,
        description: Option<&str>,
        creator: UserId,
    ) -> Result<ProjectId>;

    fn insert_task(&self, title: &str, project: ProjectId, creator: UserId) -> Result<TaskId>;

    fn insert_comment(&self, task: TaskId, user: UserId, text: &str) -> Result<CommentId>;

    fn insert_attachment(&self, task: TaskId, user: UserId) -> Result<AttachmentId>;

    /// Returns whether a row was changed.
    fn update_project_description(&self, project: ProjectId, value: &str) -> Result<bool>;

    fn update_project_deadline(&self, project: ProjectId, value: &str) -> Result<bool>;

    /// Only touches the task when it belongs to `project`.
    fn update_task_description(
        &self,
        project: ProjectId,
        task: TaskId,
        value: &str,
    ) -> Result<bool>;

    fn update_task_deadline(&self, project: ProjectId, task: TaskId, value: &str)
        -> Result<bool>;
}

/// SQLite-backed store
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and install the schema.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn, Some(path))
    }

    /// A private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::install(&conn)?;
        Ok(Self { conn, path })
    }

    /// Database file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            (code.code == ErrorCode::ConstraintViolation
                && code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
                || message
                    .as_deref()
                    .is_some_and(|value| value.contains("UNIQUE constraint failed"))
        }
        _ => false,
    }
}

fn constraint_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(_, message) => message.as_deref(),
        _ => None,
    }
}

fn map_insert_conflict(err: rusqlite::Error, kind: EntityKind, name: &str) -> Error {
    if is_unique_violation(&err) {
        return Error::Duplicate {
            kind,
            name: name.to_string(),
        };
    }
    Error::Sql(err)
}

fn require_name(kind: EntityKind, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{kind} name cannot be empty")));
    }
    Ok(trimmed.to_string())
}

//! Database schema.
//!
//! Every name-addressable table carries a `*_key` column holding the
//! normalized name; the unique index on it is both the resolution index and
//! the uniqueness guarantee the dispatcher leans on under concurrency.

use rusqlite::Connection;

use crate::error::Result;

pub(super) const SCHEMA_VERSION: i64 = 1;

const SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL,
    username_key  TEXT NOT NULL,
    email         TEXT NOT NULL,
    email_key     TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username_key ON users(username_key);
CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email_key ON users(email_key);

CREATE TABLE IF NOT EXISTS projects (
    project_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    name_key    TEXT NOT NULL,
    description TEXT,
    deadline    TEXT,
    created_by  INTEGER REFERENCES users(user_id),
    created_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_projects_name_key ON projects(name_key);

CREATE TABLE IF NOT EXISTS tasks (
    task_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id  INTEGER NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    title_key   TEXT NOT NULL,
    description TEXT,
    status      INTEGER NOT NULL DEFAULT 0,
    due_date    TEXT,
    created_by  INTEGER REFERENCES users(user_id),
    created_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_title_key ON tasks(title_key);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id, task_id);

CREATE TABLE IF NOT EXISTS comments (
    comment_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id      INTEGER NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    user_id      INTEGER NOT NULL REFERENCES users(user_id),
    comment_text TEXT NOT NULL,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_task ON comments(task_id, comment_id);

CREATE TABLE IF NOT EXISTS attachments (
    attachment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id       INTEGER NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    uploaded_by   INTEGER NOT NULL REFERENCES users(user_id),
    uploaded_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_attachments_task ON attachments(task_id, attachment_id);
"#;

pub(super) fn install(conn: &Connection) -> Result<()> {
    conn.execute_batch(SQL)?;
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version == 0 {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    } else if version > SCHEMA_VERSION {
        return Err(crate::error::Error::OperationFailed(format!(
            "database schema version {version} is newer than supported {SCHEMA_VERSION}"
        )));
    }
    Ok(())
}

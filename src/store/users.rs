use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{constraint_message, is_unique_violation, require_name, SqliteStore};
use crate::error::{Error, Result};
use crate::model::{normalize_name, EntityKind, User, UserId};

const USER_COLUMNS: &str = "user_id, username, email, password_hash, created_at";

impl SqliteStore {
    /// Insert a user with an already-hashed credential.
    ///
    /// Name and email are unique case-insensitively; a clash is reported as
    /// [`Error::DuplicateName`] or [`Error::DuplicateEmail`].
    pub fn insert_user(&self, name: &str, email: &str, credential_hash: &str) -> Result<UserId> {
        let name = require_name(EntityKind::User, name)?;
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::InvalidArgument("email cannot be empty".to_string()));
        }
        let inserted = self.conn.execute(
            "INSERT INTO users (username, username_key, email, email_key, password_hash, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                name,
                normalize_name(&name),
                email,
                normalize_name(email),
                credential_hash,
                Utc::now()
            ],
        );
        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                let message = constraint_message(&err).unwrap_or_default();
                if message.contains("email_key") {
                    return Err(Error::DuplicateEmail(email.to_string()));
                }
                return Err(Error::DuplicateName(name));
            }
            return Err(err.into());
        }
        let id = UserId(self.conn.last_insert_rowid());
        tracing::info!(user = %name, id = %id, "user registered");
        Ok(id)
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?)
    }

    /// Case-insensitive lookup by display name
    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username_key = ?1"),
                params![normalize_name(name)],
                user_from_row,
            )
            .optional()?)
    }

    /// All users in registration order
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id"))?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        credential_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

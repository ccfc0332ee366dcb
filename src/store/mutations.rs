use chrono::Utc;
use rusqlite::params;

use super::{map_insert_conflict, require_name, SqliteStore, TaskStore};
use crate::error::Result;
use crate::model::{
    normalize_name, AttachmentId, CommentId, EntityKind, ProjectId, TaskId, UserId,
};

impl TaskStore for SqliteStore {
    fn resolve(&self, kind: EntityKind, name: &str) -> Result<Option<i64>> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Ok(None);
        }
        let sql = match kind {
            EntityKind::Project => "SELECT project_id FROM projects WHERE name_key = ?1 LIMIT 2",
            EntityKind::Task => "SELECT task_id FROM tasks WHERE title_key = ?1 LIMIT 2",
            EntityKind::User => "SELECT user_id FROM users WHERE username_key = ?1 LIMIT 2",
        };
        let mut stmt = self.conn.prepare_cached(sql)?;
        let ids = stmt
            .query_map(params![key], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(match ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        })
    }

    fn insert_project(
        &self,
        name: &str,
        description: Option<&str>,
        creator: UserId,
    ) -> Result<ProjectId> {
        let name = require_name(EntityKind::Project, name)?;
        self.conn
            .execute(
                "INSERT INTO projects (name, name_key, description, created_by, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, normalize_name(&name), description, creator, Utc::now()],
            )
            .map_err(|err| map_insert_conflict(err, EntityKind::Project, &name))?;
        let id = ProjectId(self.conn.last_insert_rowid());
        tracing::info!(project = %name, id = %id, creator = %creator, "project inserted");
        Ok(id)
    }

    fn insert_task(&self, title: &str, project: ProjectId, creator: UserId) -> Result<TaskId> {
        let title = require_name(EntityKind::Task, title)?;
        self.conn
            .execute(
                "INSERT INTO tasks (project_id, title, title_key, created_by, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![project, title, normalize_name(&title), creator, Utc::now()],
            )
            .map_err(|err| map_insert_conflict(err, EntityKind::Task, &title))?;
        let id = TaskId(self.conn.last_insert_rowid());
        tracing::info!(task = %title, id = %id, project = %project, "task inserted");
        Ok(id)
    }

    fn insert_comment(&self, task: TaskId, user: UserId, text: &str) -> Result<CommentId> {
        self.conn.execute(
            "INSERT INTO comments (task_id, user_id, comment_text, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![task, user, text, Utc::now()],
        )?;
        let id = CommentId(self.conn.last_insert_rowid());
        tracing::info!(task = %task, id = %id, "comment inserted");
        Ok(id)
    }

    fn insert_attachment(&self, task: TaskId, user: UserId) -> Result<AttachmentId> {
        self.conn.execute(
            "INSERT INTO attachments (task_id, uploaded_by, uploaded_at) VALUES (?1, ?2, ?3)",
            params![task, user, Utc::now()],
        )?;
        let id = AttachmentId(self.conn.last_insert_rowid());
        tracing::info!(task = %task, user = %user, id = %id, "attachment inserted");
        Ok(id)
    }

    fn update_project_description(&self, project: ProjectId, value: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE projects SET description = ?1 WHERE project_id = ?2",
            params![value, project],
        )?;
        Ok(changed > 0)
    }

    fn update_project_deadline(&self, project: ProjectId, value: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE projects SET deadline = ?1 WHERE project_id = ?2",
            params![value, project],
        )?;
        Ok(changed > 0)
    }

    fn update_task_description(
        &self,
        project: ProjectId,
        task: TaskId,
        value: &str,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET description = ?1 WHERE task_id = ?2 AND project_id = ?3",
            params![value, task, project],
        )?;
        Ok(changed > 0)
    }

    fn update_task_deadline(
        &self,
        project: ProjectId,
        task: TaskId,
        value: &str,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE tasks SET due_date = ?1 WHERE task_id = ?2 AND project_id = ?3",
            params![value, task, project],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn store_with_user() -> (SqliteStore, UserId) {
        let store = SqliteStore::open_in_memory().expect("open");
        let user = store
            .insert_user("alice", "alice@example.com", "hash")
            .expect("insert user");
        (store, user)
    }

    #[test]
    fn resolve_is_case_insensitive_exact_match() {
        let (store, alice) = store_with_user();
        let id = store.insert_project("Alpha", None, alice).expect("insert");

        assert_eq!(
            store.resolve(EntityKind::Project, "Alpha").expect("resolve"),
            Some(id.get())
        );
        assert_eq!(
            store.resolve(EntityKind::Project, "alpha").expect("resolve"),
            Some(id.get())
        );
        assert_eq!(
            store.resolve(EntityKind::Project, "  ALPHA ").expect("resolve"),
            Some(id.get())
        );
        assert_eq!(store.resolve(EntityKind::Project, "Alp").expect("resolve"), None);
        assert_eq!(store.resolve(EntityKind::Project, "").expect("resolve"), None);
    }

    #[test]
    fn duplicate_project_name_is_reported_as_duplicate() {
        let (store, alice) = store_with_user();
        store.insert_project("Alpha", None, alice).expect("insert");
        let err = store
            .insert_project("ALPHA", None, alice)
            .expect_err("duplicate");
        assert!(matches!(
            err,
            Error::Duplicate {
                kind: EntityKind::Project,
                ..
            }
        ));
    }

    #[test]
    fn task_insert_requires_existing_project() {
        let (store, alice) = store_with_user();
        let err = store
            .insert_task("Design", ProjectId(99), alice)
            .expect_err("foreign key");
        assert!(matches!(err, Error::Sql(_)));
    }

    #[test]
    fn task_updates_are_scoped_to_project() {
        let (store, alice) = store_with_user();
        let alpha = store.insert_project("Alpha", None, alice).expect("alpha");
        let beta = store.insert_project("Beta", None, alice).expect("beta");
        let design = store.insert_task("Design", alpha, alice).expect("task");

        assert!(store
            .update_task_description(alpha, design, "wireframes")
            .expect("update"));
        assert!(!store
            .update_task_description(beta, design, "wrong project")
            .expect("update"));
        assert!(store
            .update_task_deadline(alpha, design, "2026-11-01")
            .expect("update"));
    }

    #[test]
    fn resolve_users_and_tasks() {
        let (store, alice) = store_with_user();
        let alpha = store.insert_project("Alpha", None, alice).expect("alpha");
        let design = store.insert_task("Design", alpha, alice).expect("task");
        assert_eq!(
            store.resolve(EntityKind::Task, "design").expect("resolve"),
            Some(design.get())
        );
        assert_eq!(
            store.resolve(EntityKind::User, "ALICE").expect("resolve"),
            Some(alice.get())
        );
    }
}

use rusqlite::Row;

use super::SqliteStore;
use crate::error::{Error, Result};
use crate::materialize::{
    materialize, AttachmentFacts, CommentFacts, JoinRow, ProjectFacts, TaskFacts,
};
use crate::model::{AttachmentId, CommentId, Project, ProjectId, TaskId, UserId, UserRef};

const PROJECT_TREE_SQL: &str = r#"
SELECT
    p.project_id, p.name, p.description, p.deadline, p.created_at,
    p.created_by, pc.username, pc.email,
    t.task_id, t.title, t.description, t.status, t.due_date, t.created_at,
    t.created_by, tc.username, tc.email,
    a.attachment_id, a.uploaded_at, a.uploaded_by, au.username, au.email,
    c.comment_id, c.comment_text, c.created_at, c.user_id, cu.username, cu.email
FROM projects p
LEFT JOIN users pc ON pc.user_id = p.created_by
LEFT JOIN tasks t ON t.project_id = p.project_id
LEFT JOIN users tc ON tc.user_id = t.created_by
LEFT JOIN attachments a ON a.task_id = t.task_id
LEFT JOIN users au ON au.user_id = a.uploaded_by
LEFT JOIN comments c ON c.task_id = t.task_id
LEFT JOIN users cu ON cu.user_id = c.user_id
ORDER BY p.project_id, t.task_id, a.attachment_id, c.comment_id
"#;

impl SqliteStore {
    /// Every project with its tasks, comments, attachments and assignees.
    ///
    /// Streams the fan-out join straight into the materializer; rows are
    /// never collected.
    pub fn load_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(PROJECT_TREE_SQL)?;
        let rows = stmt
            .query_map([], join_row_from_row)?
            .map(|row| row.map_err(Error::from));
        materialize(rows)
    }
}

fn user_ref(row: &Row<'_>, id: usize) -> rusqlite::Result<Option<UserRef>> {
    let Some(user_id) = row.get::<_, Option<UserId>>(id)? else {
        return Ok(None);
    };
    Ok(Some(UserRef {
        id: user_id,
        name: row.get(id + 1)?,
        email: row.get(id + 2)?,
    }))
}

pub(super) fn join_row_from_row(row: &Row<'_>) -> rusqlite::Result<JoinRow> {
    let project = match row.get::<_, Option<ProjectId>>(0)? {
        Some(id) => Some(ProjectFacts {
            id,
            name: row.get(1)?,
            description: row.get(2)?,
            deadline: row.get(3)?,
            created_at: row.get(4)?,
            created_by: user_ref(row, 5)?,
        }),
        None => None,
    };

    let task = match row.get::<_, Option<TaskId>>(8)? {
        Some(id) => Some(TaskFacts {
            id,
            title: row.get(9)?,
            description: row.get(10)?,
            done: row.get::<_, Option<bool>>(11)?.unwrap_or(false),
            due_date: row.get(12)?,
            created_at: row.get(13)?,
            created_by: user_ref(row, 14)?,
        }),
        None => None,
    };

    let attachment = match (row.get::<_, Option<AttachmentId>>(17)?, user_ref(row, 19)?) {
        (Some(id), Some(uploaded_by)) => Some(AttachmentFacts {
            id,
            uploaded_at: row.get(18)?,
            uploaded_by,
        }),
        _ => None,
    };

    let comment = match (row.get::<_, Option<CommentId>>(22)?, user_ref(row, 25)?) {
        (Some(id), Some(author)) => Some(CommentFacts {
            id,
            text: row.get(23)?,
            created_at: row.get(24)?,
            author,
        }),
        _ => None,
    };

    Ok(JoinRow {
        project,
        task,
        attachment,
        comment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStore;

    #[test]
    fn load_projects_deduplicates_join_fan_out() {
        let store = SqliteStore::open_in_memory().expect("open");
        let alice = store
            .insert_user("alice", "alice@example.com", "h")
            .expect("alice");
        let bob = store.insert_user("bob", "bob@example.com", "h").expect("bob");
        let alpha = store.insert_project("Alpha", None, alice).expect("alpha");
        let design = store.insert_task("Design", alpha, alice).expect("design");
        store.insert_comment(design, alice, "looks good").expect("c1");
        store.insert_comment(design, bob, "agreed").expect("c2");
        store.insert_attachment(design, bob).expect("a1");
        store.insert_attachment(design, alice).expect("a2");
        store.insert_project("Empty", None, alice).expect("empty");

        let projects = store.load_projects().expect("load");
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Alpha");
        assert_eq!(projects[1].name, "Empty");
        assert!(projects[1].tasks.is_empty());

        let task = &projects[0].tasks[0];
        assert_eq!(task.title, "Design");
        assert_eq!(task.comments.len(), 2);
        assert_eq!(task.attachments.len(), 2);
        assert_eq!(task.assignees.len(), 2);
        assert_eq!(task.comments[1].author.name.as_deref(), Some("bob"));
        assert_eq!(
            projects[0].created_by.as_ref().and_then(|u| u.name.as_deref()),
            Some("alice")
        );
    }

    #[test]
    fn empty_store_has_no_projects() {
        let store = SqliteStore::open_in_memory().expect("open");
        assert!(store.load_projects().expect("load").is_empty());
    }
}

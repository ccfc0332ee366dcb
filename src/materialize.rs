//! Rebuilds the nested project tree from flat join rows.
//!
//! The join behind a view fans out across two independent one-to-many
//! relations of a task (attachments and comments), so a task with 3 comments
//! and 2 attachments arrives as 6 rows. Every nesting level keeps an
//! identity-keyed index of what it has already recorded; a comment,
//! attachment or assignee is appended once per identity no matter how many
//! rows repeat it.
//!
//! Rows are consumed in arrival order in a single pass. Output order is
//! "first distinct identity wins position" at every level; nothing is sorted.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    Attachment, AttachmentId, Comment, CommentId, Project, ProjectId, Task, TaskId, UserId,
    UserRef,
};

/// Project columns of a join row
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFacts {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserRef>,
}

/// Task columns of a join row
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFacts {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
    pub due_date: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<UserRef>,
}

/// Attachment (assignment) columns of a join row
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentFacts {
    pub id: AttachmentId,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub uploaded_by: UserRef,
}

/// Comment columns of a join row
#[derive(Debug, Clone, PartialEq)]
pub struct CommentFacts {
    pub id: CommentId,
    pub text: String,
    pub created_at: Option<DateTime<Utc>>,
    pub author: UserRef,
}

/// One flat row of the project/task/attachment/comment outer join.
///
/// A group is `None` when the outer join found no match on that side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinRow {
    pub project: Option<ProjectFacts>,
    pub task: Option<TaskFacts>,
    pub attachment: Option<AttachmentFacts>,
    pub comment: Option<CommentFacts>,
}

struct TaskBuild {
    task: Task,
    comments: HashSet<CommentId>,
    attachments: HashSet<AttachmentId>,
    assignees: HashSet<UserId>,
}

struct ProjectBuild {
    project: Project,
    tasks: Vec<TaskBuild>,
    task_index: HashMap<TaskId, usize>,
}

/// Streaming builder for the project tree.
#[derive(Default)]
pub struct Materializer {
    projects: Vec<ProjectBuild>,
    project_index: HashMap<ProjectId, usize>,
    rows: usize,
    dropped: usize,
}

impl Materializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one join row into the tree.
    pub fn push(&mut self, row: JoinRow) {
        self.rows += 1;
        let JoinRow {
            project,
            task,
            attachment,
            comment,
        } = row;

        let Some(project) = project else {
            if task.is_some() || attachment.is_some() || comment.is_some() {
                self.dropped += 1;
            }
            return;
        };

        let project_slot = match self.project_index.get(&project.id) {
            Some(&slot) => slot,
            None => {
                let slot = self.projects.len();
                self.project_index.insert(project.id, slot);
                self.projects.push(ProjectBuild::new(project));
                slot
            }
        };
        let build = &mut self.projects[project_slot];

        let Some(task) = task else {
            if attachment.is_some() || comment.is_some() {
                self.dropped += 1;
            }
            return;
        };

        let task_build = build.task_entry(task);
        if let Some(attachment) = attachment {
            task_build.record_attachment(attachment);
        }
        if let Some(comment) = comment {
            task_build.record_comment(comment);
        }
    }

    /// Number of rows consumed so far
    pub fn rows_seen(&self) -> usize {
        self.rows
    }

    /// Finish and return projects in first-seen order.
    pub fn finish(self) -> Vec<Project> {
        if self.dropped > 0 {
            tracing::debug!(
                rows = self.rows,
                dropped = self.dropped,
                "ignored join rows without a parent entity"
            );
        }
        self.projects
            .into_iter()
            .map(ProjectBuild::into_project)
            .collect()
    }
}

impl ProjectBuild {
    fn new(facts: ProjectFacts) -> Self {
        Self {
            project: Project {
                id: facts.id,
                name: facts.name,
                description: facts.description,
                deadline: facts.deadline,
                created_by: facts.created_by,
                created_at: facts.created_at,
                tasks: Vec::new(),
            },
            tasks: Vec::new(),
            task_index: HashMap::new(),
        }
    }

    fn task_entry(&mut self, facts: TaskFacts) -> &mut TaskBuild {
        let slot = match self.task_index.get(&facts.id) {
            Some(&slot) => slot,
            None => {
                let slot = self.tasks.len();
                self.task_index.insert(facts.id, slot);
                self.tasks.push(TaskBuild::new(self.project.id, facts));
                slot
            }
        };
        &mut self.tasks[slot]
    }

    fn into_project(self) -> Project {
        let mut project = self.project;
        project.tasks = self.tasks.into_iter().map(|build| build.task).collect();
        project
    }
}

impl TaskBuild {
    fn new(project_id: ProjectId, facts: TaskFacts) -> Self {
        Self {
            task: Task {
                id: facts.id,
                project_id,
                title: facts.title,
                description: facts.description,
                done: facts.done,
                due_date: facts.due_date,
                created_by: facts.created_by,
                created_at: facts.created_at,
                comments: Vec::new(),
                attachments: Vec::new(),
                assignees: Vec::new(),
            },
            comments: HashSet::new(),
            attachments: HashSet::new(),
            assignees: HashSet::new(),
        }
    }

    fn record_attachment(&mut self, facts: AttachmentFacts) {
        // Assignee identity is the user, not the attachment row: two
        // attachments by the same user yield one assignee.
        if self.assignees.insert(facts.uploaded_by.id) {
            self.task.assignees.push(facts.uploaded_by.clone());
        }
        if self.attachments.insert(facts.id) {
            self.task.attachments.push(Attachment {
                id: facts.id,
                task_id: self.task.id,
                uploaded_by: facts.uploaded_by,
                uploaded_at: facts.uploaded_at,
            });
        }
    }

    fn record_comment(&mut self, facts: CommentFacts) {
        if !self.comments.insert(facts.id) {
            return;
        }
        self.task.comments.push(Comment {
            id: facts.id,
            task_id: self.task.id,
            author: facts.author,
            text: facts.text,
            created_at: facts.created_at,
        });
    }
}

/// Materialize a finite, single-pass sequence of join rows.
///
/// The first row error aborts and is returned.
pub fn materialize<I>(rows: I) -> Result<Vec<Project>>
where
    I: IntoIterator<Item = Result<JoinRow>>,
{
    let mut materializer = Materializer::new();
    for row in rows {
        materializer.push(row?);
    }
    tracing::debug!(rows = materializer.rows_seen(), "materialized join rows");
    Ok(materializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn user(id: i64, name: &str) -> UserRef {
        UserRef {
            id: UserId(id),
            name: Some(name.to_string()),
            email: None,
        }
    }

    fn project(id: i64, name: &str) -> ProjectFacts {
        ProjectFacts {
            id: ProjectId(id),
            name: name.to_string(),
            description: None,
            deadline: None,
            created_at: None,
            created_by: Some(user(1, "alice")),
        }
    }

    fn task(id: i64, title: &str) -> TaskFacts {
        TaskFacts {
            id: TaskId(id),
            title: title.to_string(),
            description: None,
            done: false,
            due_date: None,
            created_at: None,
            created_by: None,
        }
    }

    fn attachment(id: i64, by: UserRef) -> AttachmentFacts {
        AttachmentFacts {
            id: AttachmentId(id),
            uploaded_at: None,
            uploaded_by: by,
        }
    }

    fn comment(id: i64, text: &str) -> CommentFacts {
        CommentFacts {
            id: CommentId(id),
            text: text.to_string(),
            created_at: None,
            author: user(1, "alice"),
        }
    }

    fn fan_out(
        project_facts: ProjectFacts,
        task_facts: TaskFacts,
        attachments: &[AttachmentFacts],
        comments: &[CommentFacts],
    ) -> Vec<Result<JoinRow>> {
        let mut rows = Vec::new();
        for attachment in attachments {
            for comment in comments {
                rows.push(Ok(JoinRow {
                    project: Some(project_facts.clone()),
                    task: Some(task_facts.clone()),
                    attachment: Some(attachment.clone()),
                    comment: Some(comment.clone()),
                }));
            }
        }
        rows
    }

    #[test]
    fn fan_out_rows_collapse_to_distinct_children() {
        let rows = fan_out(
            project(1, "Alpha"),
            task(1, "Design"),
            &[attachment(1, user(2, "bob")), attachment(2, user(3, "carol"))],
            &[comment(1, "looks good"), comment(2, "ship it")],
        );
        assert_eq!(rows.len(), 4);

        let projects = materialize(rows).expect("materialize");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].tasks.len(), 1);
        let design = &projects[0].tasks[0];
        assert_eq!(design.comments.len(), 2);
        assert_eq!(design.attachments.len(), 2);
        assert_eq!(design.assignees.len(), 2);
        assert_eq!(design.comments[0].text, "looks good");
        assert_eq!(design.comments[1].text, "ship it");
    }

    #[test]
    fn three_comments_two_attachments_are_not_multiplied() {
        let rows = fan_out(
            project(1, "Alpha"),
            task(1, "Design"),
            &[attachment(1, user(2, "bob")), attachment(2, user(2, "bob"))],
            &[comment(1, "a"), comment(2, "b"), comment(3, "c")],
        );
        assert_eq!(rows.len(), 6);

        let projects = materialize(rows).expect("materialize");
        let design = &projects[0].tasks[0];
        assert_eq!(design.comments.len(), 3);
        assert_eq!(design.attachments.len(), 2);
        // Both attachments were uploaded by bob.
        assert_eq!(design.assignees.len(), 1);
    }

    #[test]
    fn project_without_tasks_is_kept() {
        let rows = vec![Ok(JoinRow {
            project: Some(project(4, "Empty")),
            ..JoinRow::default()
        })];
        let projects = materialize(rows).expect("materialize");
        assert_eq!(projects.len(), 1);
        assert!(projects[0].tasks.is_empty());
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let rows = vec![
            Ok(JoinRow {
                project: Some(project(9, "Zeta")),
                task: Some(task(5, "Later")),
                ..JoinRow::default()
            }),
            Ok(JoinRow {
                project: Some(project(2, "Beta")),
                ..JoinRow::default()
            }),
            Ok(JoinRow {
                project: Some(project(9, "Zeta")),
                task: Some(task(3, "Sooner")),
                ..JoinRow::default()
            }),
        ];
        let projects = materialize(rows).expect("materialize");
        let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Zeta", "Beta"]);
        let titles: Vec<_> = projects[0].tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Later", "Sooner"]);
    }

    #[test]
    fn same_task_id_under_two_projects_stays_separate() {
        let rows = vec![
            Ok(JoinRow {
                project: Some(project(1, "Alpha")),
                task: Some(task(1, "Design")),
                comment: Some(comment(1, "first")),
                ..JoinRow::default()
            }),
            Ok(JoinRow {
                project: Some(project(2, "Beta")),
                task: Some(task(1, "Design")),
                comment: Some(comment(1, "first")),
                ..JoinRow::default()
            }),
        ];
        let projects = materialize(rows).expect("materialize");
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].tasks[0].comments.len(), 1);
        assert_eq!(projects[1].tasks[0].comments.len(), 1);
        assert_eq!(projects[1].tasks[0].project_id, ProjectId(2));
    }

    #[test]
    fn orphan_rows_are_ignored() {
        let rows = vec![Ok(JoinRow {
            task: Some(task(1, "Loose")),
            comment: Some(comment(1, "nobody home")),
            ..JoinRow::default()
        })];
        let projects = materialize(rows).expect("materialize");
        assert!(projects.is_empty());
    }

    #[test]
    fn row_error_aborts() {
        let rows = vec![
            Ok(JoinRow {
                project: Some(project(1, "Alpha")),
                ..JoinRow::default()
            }),
            Err(Error::OperationFailed("cursor broke".to_string())),
        ];
        let err = materialize(rows).expect_err("error propagates");
        assert!(matches!(err, Error::OperationFailed(_)));
    }

    #[test]
    fn streaming_builder_counts_rows() {
        let mut materializer = Materializer::new();
        for _ in 0..3 {
            materializer.push(JoinRow {
                project: Some(project(1, "Alpha")),
                task: Some(task(1, "Design")),
                comment: Some(comment(7, "same")),
                ..JoinRow::default()
            });
        }
        assert_eq!(materializer.rows_seen(), 3);
        let projects = materializer.finish();
        assert_eq!(projects[0].tasks[0].comments.len(), 1);
    }
}

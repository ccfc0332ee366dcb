//! Realizes an intent as a sequence of store mutations.
//!
//! The dispatcher keeps no state between calls and holds no lock between
//! resolving a name and inserting it. Uniqueness lives in the store: when an
//! insert loses a race it comes back as [`Error::Duplicate`], and the name is
//! resolved again to pick up the row that won.
//!
//! Missing prerequisites (no project, no task) produce a clarification in the
//! outcome and never abort the rest of the intent. In `assign` an unresolved
//! name fails the whole request; pairs assigned before the failure stay.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::intent::{Intent, IntentKind};
use crate::model::{EntityKind, ProjectId, TaskId, UserId};
use crate::resolver::EntityResolver;
use crate::store::TaskStore;

pub const ASK_FOR_PROJECT: &str = "please specify an available project";
pub const ASK_FOR_TASK: &str = "please specify an available task";
pub const ASK_FOR_USER: &str = "please specify an available user";

/// Counters for what one dispatch did to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub projects_created: usize,
    pub projects_reused: usize,
    pub tasks_created: usize,
    pub tasks_reused: usize,
    pub comments_added: usize,
    pub assignments_added: usize,
    pub projects_updated: usize,
    pub tasks_updated: usize,
    pub skipped: usize,
}

/// Bot messages plus counters, in the order the work happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub kind: Option<IntentKind>,
    pub messages: Vec<String>,
    pub stats: DispatchStats,
}

impl DispatchOutcome {
    fn say(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Whether any clarification was requested.
    pub fn needs_clarification(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m == ASK_FOR_PROJECT || m == ASK_FOR_TASK || m == ASK_FOR_USER)
    }
}

/// Resolved id and whether this call inserted it.
#[derive(Debug, Clone, Copy)]
struct Ensured {
    id: i64,
    created: bool,
}

pub struct CommandDispatcher<'a, S: TaskStore + ?Sized> {
    store: &'a S,
    resolver: EntityResolver<'a, S>,
}

impl<'a, S: TaskStore + ?Sized> CommandDispatcher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            resolver: EntityResolver::new(store),
        }
    }

    pub fn dispatch(&self, intent: &Intent, requester: UserId) -> Result<DispatchOutcome> {
        let mut outcome = DispatchOutcome {
            kind: Some(intent.kind),
            ..DispatchOutcome::default()
        };
        tracing::debug!(intent = %intent, requester = %requester, "dispatching intent");
        match intent.kind {
            IntentKind::Create => self.create(intent, requester, &mut outcome)?,
            IntentKind::Assign => self.assign(intent, &mut outcome)?,
            IntentKind::Update => self.update(intent, &mut outcome)?,
        }
        tracing::debug!(stats = ?outcome.stats, "intent dispatched");
        Ok(outcome)
    }

    fn create(&self, intent: &Intent, requester: UserId, out: &mut DispatchOutcome) -> Result<()> {
        let projects = names(&intent.projects);
        if projects.is_empty() {
            out.say(ASK_FOR_PROJECT);
            return Ok(());
        }

        let mut current: Option<(ProjectId, &str)> = None;
        for name in projects {
            let ensured = self.ensure(EntityKind::Project, name, || {
                self.store
                    .insert_project(name, None, requester)
                    .map(ProjectId::get)
            })?;
            if ensured.created {
                out.stats.projects_created += 1;
                out.say(format!("created project {name}"));
            } else {
                out.stats.projects_reused += 1;
                out.say(format!("project {name} already exists"));
            }
            current = Some((ProjectId(ensured.id), name));
        }
        let Some((project, project_name)) = current else {
            return Ok(());
        };

        let tasks = names(&intent.tasks);
        let comments = names(&intent.comments);
        if tasks.is_empty() {
            if !comments.is_empty() {
                out.say(ASK_FOR_TASK);
            }
            return Ok(());
        }

        for title in tasks {
            let ensured = self.ensure(EntityKind::Task, title, || {
                self.store
                    .insert_task(title, project, requester)
                    .map(TaskId::get)
            })?;
            let task = TaskId(ensured.id);
            if ensured.created {
                out.stats.tasks_created += 1;
                out.say(format!("created task {title} in {project_name}"));
            } else {
                out.stats.tasks_reused += 1;
                out.say(format!("task {title} already exists"));
            }

            let mut added = 0;
            for text in &comments {
                self.store.insert_comment(task, requester, text)?;
                added += 1;
            }
            if added > 0 {
                out.stats.comments_added += added;
                out.say(format!("added {added} comment(s) to {title}"));
            }
        }
        Ok(())
    }

    fn assign(&self, intent: &Intent, out: &mut DispatchOutcome) -> Result<()> {
        let tasks = names(&intent.tasks);
        let users = names(&intent.users);
        if tasks.is_empty() {
            out.say(ASK_FOR_TASK);
        }
        if users.is_empty() {
            out.say(ASK_FOR_USER);
        }
        if tasks.is_empty() || users.is_empty() {
            return Ok(());
        }

        for title in &tasks {
            for user_name in &users {
                let user = self.resolver.user(user_name)?.ok_or_else(|| Error::Unresolved {
                    kind: EntityKind::User,
                    name: user_name.to_string(),
                })?;
                let task = self.resolver.task(title)?.ok_or_else(|| Error::Unresolved {
                    kind: EntityKind::Task,
                    name: title.to_string(),
                })?;
                self.store.insert_attachment(task, user)?;
                out.stats.assignments_added += 1;
                out.say(format!("assigned {title} to {user_name}"));
            }
        }
        Ok(())
    }

    fn update(&self, intent: &Intent, out: &mut DispatchOutcome) -> Result<()> {
        let projects = names(&intent.projects);
        if projects.is_empty() {
            out.say(ASK_FOR_PROJECT);
            return Ok(());
        }
        if intent.description.is_empty() && intent.deadline.is_empty() {
            out.say("nothing to update: give a description or a deadline");
            return Ok(());
        }
        let tasks = names(&intent.tasks);

        for project_name in projects {
            let Some(project) = self.resolver.project(project_name)? else {
                out.stats.skipped += 1;
                out.say(format!("project {project_name} not found, skipped"));
                continue;
            };

            if tasks.is_empty() {
                let mut changed = false;
                for value in &intent.description {
                    changed |= self.store.update_project_description(project, value)?;
                }
                for value in &intent.deadline {
                    changed |= self.store.update_project_deadline(project, value)?;
                }
                if changed {
                    out.stats.projects_updated += 1;
                    tracing::info!(project = %project, "project updated");
                    out.say(format!("updated project {project_name}"));
                }
                continue;
            }

            for title in &tasks {
                let Some(task) = self.resolver.task(title)? else {
                    out.stats.skipped += 1;
                    out.say(format!("task {title} not found, skipped"));
                    continue;
                };
                let mut changed = false;
                for value in &intent.description {
                    changed |= self.store.update_task_description(project, task, value)?;
                }
                for value in &intent.deadline {
                    changed |= self.store.update_task_deadline(project, task, value)?;
                }
                if changed {
                    out.stats.tasks_updated += 1;
                    tracing::info!(project = %project, task = %task, "task updated");
                    out.say(format!("updated task {title} in {project_name}"));
                } else {
                    out.stats.skipped += 1;
                    out.say(format!("task {title} is not in {project_name}, skipped"));
                }
            }
        }
        Ok(())
    }

    /// Resolve `name`, inserting it when absent. A lost insert race is
    /// recovered by resolving again.
    fn ensure(
        &self,
        kind: EntityKind,
        name: &str,
        insert: impl FnOnce() -> Result<i64>,
    ) -> Result<Ensured> {
        if let Some(id) = self.resolver.resolve(kind, name)? {
            return Ok(Ensured { id, created: false });
        }
        match insert() {
            Ok(id) => Ok(Ensured { id, created: true }),
            Err(Error::Duplicate { kind, name }) => match self.resolver.resolve(kind, &name)? {
                Some(id) => {
                    tracing::warn!(%kind, name = %name, id, "insert raced, using existing row");
                    Ok(Ensured { id, created: false })
                }
                None => Err(Error::Duplicate { kind, name }),
            },
            Err(err) => Err(err),
        }
    }
}

/// Non-blank names, trimmed, in order.
/// Trimmed, non-blank entries of an intent list
fn names(values: &[String]) -> Vec<&str> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect()
}

//! Name-to-id resolution for projects, tasks and users.
//!
//! Resolution is a case-insensitive exact match: "Alpha", "alpha" and
//! " ALPHA " all name the same project, "Alp" names nothing. Not finding a
//! name is an ordinary outcome (`Ok(None)`), not an error; callers decide
//! whether that means "insert it" or "ask the user again".

use crate::error::Result;
use crate::model::{EntityKind, ProjectId, TaskId, UserId};
use crate::store::TaskStore;

pub struct EntityResolver<'a, S: TaskStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TaskStore + ?Sized> EntityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn resolve(&self, kind: EntityKind, name: &str) -> Result<Option<i64>> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let resolved = self.store.resolve(kind, name)?;
        tracing::debug!(%kind, name, ?resolved, "resolved name");
        Ok(resolved)
    }

    pub fn project(&self, name: &str) -> Result<Option<ProjectId>> {
        Ok(self.resolve(EntityKind::Project, name)?.map(ProjectId))
    }

    pub fn task(&self, name: &str) -> Result<Option<TaskId>> {
        Ok(self.resolve(EntityKind::Task, name)?.map(TaskId))
    }

    pub fn user(&self, name: &str) -> Result<Option<UserId>> {
        Ok(self.resolve(EntityKind::User, name)?.map(UserId))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[test]
    fn resolution_ignores_case() {
        let store = SqliteStore::open_in_memory().expect("open");
        let alice = store
            .insert_user("Alice", "alice@example.com", "h")
            .expect("user");
        let alpha = store.insert_project("Alpha", None, alice).expect("project");
        let resolver = EntityResolver::new(&store);

        assert_eq!(resolver.project("Alpha").expect("resolve"), Some(alpha));
        assert_eq!(
            resolver.project("Alpha").expect("resolve"),
            resolver.project("alpha").expect("resolve")
        );
        assert_eq!(resolver.user("aLiCe").expect("resolve"), Some(alice));
    }

    #[test]
    fn partial_and_blank_names_do_not_resolve() {
        let store = SqliteStore::open_in_memory().expect("open");
        let alice = store
            .insert_user("alice", "alice@example.com", "h")
            .expect("user");
        let alpha = store.insert_project("Alpha", None, alice).expect("project");
        store.insert_task("Design review", alpha, alice).expect("task");
        let resolver = EntityResolver::new(&store);

        assert_eq!(resolver.project("Alph").expect("resolve"), None);
        assert_eq!(resolver.task("Design").expect("resolve"), None);
        assert_eq!(resolver.task("   ").expect("resolve"), None);
    }
}

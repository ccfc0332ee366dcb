//! Per-user session storage.
//!
//! A session is a small JSON map keyed by name. The chat service keeps the
//! logged-in user id and the transcript there. `update` is the only
//! read-modify-write a store offers; it runs under the store's per-session
//! lock, so concurrent appends to one transcript are never lost.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::chat::{ChatHistoryEntry, ChatLog};
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::model::UserId;
use crate::storage::Storage;

pub const AUTHENTICATED_USER_ID: &str = "authenticated-user-id";
pub const CHAT_HISTORY: &str = "chat-history";

pub const DEFAULT_SESSION: &str = "default";

pub trait SessionStore {
    fn get(&self, session: &str, key: &str) -> Result<Option<Value>>;
    fn put(&self, session: &str, key: &str, value: Value) -> Result<()>;
    fn remove(&self, session: &str, key: &str) -> Result<()>;

    /// Replace `key` with `f(current)` without another writer in between.
    fn update(
        &self,
        session: &str,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Map<String, Value>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_sessions<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, Map<String, Value>>) -> T,
    ) -> Result<T> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| Error::OperationFailed("session map poisoned".to_string()))?;
        Ok(f(&mut sessions))
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session: &str, key: &str) -> Result<Option<Value>> {
        self.with_sessions(|sessions| sessions.get(session).and_then(|map| map.get(key)).cloned())
    }

    fn put(&self, session: &str, key: &str, value: Value) -> Result<()> {
        self.with_sessions(|sessions| {
            sessions
                .entry(session.to_string())
                .or_default()
                .insert(key.to_string(), value);
        })
    }

    fn remove(&self, session: &str, key: &str) -> Result<()> {
        self.with_sessions(|sessions| {
            if let Some(map) = sessions.get_mut(session) {
                map.remove(key);
            }
        })
    }

    fn update(
        &self,
        session: &str,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<()> {
        self.with_sessions(|sessions| {
            let map = sessions.entry(session.to_string()).or_default();
            let value = f(map.get(key).cloned())?;
            map.insert(key.to_string(), value);
            Ok(())
        })?
    }
}

/// One JSON file per session. Every access, including the whole of an
/// `update`, holds the session's exclusive lock.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    storage: Storage,
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileSessionStore {
    pub fn new(storage: Storage, dir: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            storage,
            dir: dir.into(),
            lock_timeout_ms,
        }
    }

    fn session_file(&self, session: &str) -> Result<PathBuf> {
        Ok(self.dir.join(format!("{}.json", session_file_stem(session)?)))
    }

    fn read_map(&self, path: &std::path::Path) -> Result<Map<String, Value>> {
        Ok(self.storage.read_json_opt(path)?.unwrap_or_default())
    }

    fn modify(
        &self,
        session: &str,
        f: impl FnOnce(&mut Map<String, Value>) -> Result<()>,
    ) -> Result<()> {
        let path = self.session_file(session)?;
        let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
        let mut map = self.read_map(&path)?;
        f(&mut map)?;
        self.storage.write_json(&path, &map)
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, session: &str, key: &str) -> Result<Option<Value>> {
        let path = self.session_file(session)?;
        let _lock = FileLock::acquire(lock::lock_path_for(&path), self.lock_timeout_ms)?;
        Ok(self.read_map(&path)?.remove(key))
    }

    fn put(&self, session: &str, key: &str, value: Value) -> Result<()> {
        self.modify(session, |map| {
            map.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove(&self, session: &str, key: &str) -> Result<()> {
        self.modify(session, |map| {
            map.remove(key);
            Ok(())
        })
    }

    fn update(
        &self,
        session: &str,
        key: &str,
        f: &mut dyn FnMut(Option<Value>) -> Result<Value>,
    ) -> Result<()> {
        self.modify(session, |map| {
            let value = f(map.remove(key))?;
            map.insert(key.to_string(), value);
            Ok(())
        })
    }
}

/// Session names become file names, so only a conservative alphabet passes.
fn session_file_stem(session: &str) -> Result<&str> {
    let valid = !session.is_empty()
        && session.len() <= 64
        && session
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(session)
    } else {
        Err(Error::InvalidArgument(format!(
            "invalid session name '{session}' (use letters, digits, '-' or '_')"
        )))
    }
}

/// Typed access to the keys the chat service uses.
pub struct Session<'a, S: SessionStore + ?Sized> {
    store: &'a S,
    id: String,
}

impl<'a, S: SessionStore + ?Sized> Session<'a, S> {
    pub fn new(store: &'a S, id: impl Into<String>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }

    pub fn user_id(&self) -> Result<Option<UserId>> {
        match self.store.get(&self.id, AUTHENTICATED_USER_ID)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn set_user_id(&self, user: UserId) -> Result<()> {
        self.store
            .put(&self.id, AUTHENTICATED_USER_ID, serde_json::to_value(user)?)
    }

    pub fn clear_user_id(&self) -> Result<()> {
        self.store.remove(&self.id, AUTHENTICATED_USER_ID)
    }

    pub fn history(&self, limit: Option<usize>) -> Result<ChatLog> {
        let entries: Vec<ChatHistoryEntry> = match self.store.get(&self.id, CHAT_HISTORY)? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        Ok(ChatLog::from_entries(entries, limit))
    }

    pub fn put_history(&self, log: &ChatLog) -> Result<()> {
        let entries: Vec<&ChatHistoryEntry> = log.entries().collect();
        self.store
            .put(&self.id, CHAT_HISTORY, serde_json::to_value(entries)?)
    }

    /// Append `entries` to the stored transcript in one locked update,
    /// keeping at most `limit` entries.
    pub fn append_history(&self, entries: &[ChatHistoryEntry], limit: Option<usize>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.store.update(&self.id, CHAT_HISTORY, &mut |current| {
            let stored: Vec<ChatHistoryEntry> = match current {
                Some(value) => serde_json::from_value(value)?,
                None => Vec::new(),
            };
            let mut log = ChatLog::from_entries(stored, limit);
            for entry in entries {
                log.push(entry.clone());
            }
            Ok(serde_json::to_value(log.into_vec())?)
        })
    }

    pub fn clear_history(&self) -> Result<()> {
        self.store.remove(&self.id, CHAT_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn file_store(temp: &TempDir) -> FileSessionStore {
        FileSessionStore::new(
            Storage::new(temp.path()),
            temp.path().join("sessions"),
            1000,
        )
    }

    #[test]
    fn memory_store_get_put_remove() {
        let store = MemorySessionStore::new();
        assert!(store.get("s1", "k").unwrap().is_none());
        store.put("s1", "k", json!(1)).unwrap();
        store.put("s2", "k", json!(2)).unwrap();
        assert_eq!(store.get("s1", "k").unwrap(), Some(json!(1)));
        store.remove("s1", "k").unwrap();
        assert!(store.get("s1", "k").unwrap().is_none());
        assert_eq!(store.get("s2", "k").unwrap(), Some(json!(2)));
    }

    #[test]
    fn file_store_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        file_store(&temp).put("alice", "k", json!({"a": 1})).unwrap();
        file_store(&temp).put("alice", "other", json!(true)).unwrap();

        let reopened = file_store(&temp);
        assert_eq!(reopened.get("alice", "k").unwrap(), Some(json!({"a": 1})));
        assert_eq!(reopened.get("alice", "other").unwrap(), Some(json!(true)));
        reopened.remove("alice", "k").unwrap();
        assert!(reopened.get("alice", "k").unwrap().is_none());
        assert!(temp.path().join("sessions").join("alice.json").exists());
    }

    #[test]
    fn file_store_rejects_path_like_names() {
        let temp = TempDir::new().unwrap();
        let store = file_store(&temp);
        assert!(matches!(
            store.put("../escape", "k", json!(1)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(store.get("", "k"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn update_sees_current_value_and_keeps_other_keys() {
        let temp = TempDir::new().unwrap();
        let store = file_store(&temp);
        store.put("alice", "other", json!("kept")).unwrap();
        store
            .update("alice", "n", &mut |current| {
                assert!(current.is_none());
                Ok(json!(1))
            })
            .unwrap();
        store
            .update("alice", "n", &mut |current| {
                let n = current.and_then(|v| v.as_i64()).unwrap_or_default();
                Ok(json!(n + 1))
            })
            .unwrap();
        assert_eq!(store.get("alice", "n").unwrap(), Some(json!(2)));
        assert_eq!(store.get("alice", "other").unwrap(), Some(json!("kept")));
    }

    #[test]
    fn failed_update_leaves_value_untouched() {
        let store = MemorySessionStore::new();
        store.put("s", "k", json!(1)).unwrap();
        let err = store.update("s", "k", &mut |_| {
            Err(Error::OperationFailed("nope".to_string()))
        });
        assert!(err.is_err());
        assert_eq!(store.get("s", "k").unwrap(), Some(json!(1)));
    }

    #[test]
    fn append_history_respects_limit() {
        let store = MemorySessionStore::new();
        let session = Session::new(&store, "s");
        let entries: Vec<ChatHistoryEntry> = (0..4)
            .map(|i| ChatHistoryEntry::new("alice", format!("m{i}")))
            .collect();
        session.append_history(&entries[..2], Some(3)).unwrap();
        session.append_history(&entries[2..], Some(3)).unwrap();
        session.append_history(&[], Some(3)).unwrap();
        let texts: Vec<String> = session
            .history(None)
            .unwrap()
            .entries()
            .map(|e| e.text.clone())
            .collect();
        assert_eq!(texts, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn session_user_and_history() {
        let store = MemorySessionStore::new();
        let session = Session::new(&store, DEFAULT_SESSION);
        assert!(session.user_id().unwrap().is_none());

        session.set_user_id(UserId(7)).unwrap();
        assert_eq!(session.user_id().unwrap(), Some(UserId(7)));
        assert_eq!(
            store.get(DEFAULT_SESSION, AUTHENTICATED_USER_ID).unwrap(),
            Some(json!(7))
        );

        let mut log = session.history(None).unwrap();
        log.push_message("alice", "hi");
        log.push_message("Bot", "hello");
        session.put_history(&log).unwrap();
        let texts: Vec<String> = session
            .history(None)
            .unwrap()
            .entries()
            .map(|e| e.text.clone())
            .collect();
        assert_eq!(texts, vec!["hi", "hello"]);

        session.clear_user_id().unwrap();
        assert!(session.user_id().unwrap().is_none());
    }
}

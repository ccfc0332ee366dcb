//! The per-session chat transcript.
//!
//! Append-only and ordered. With a limit set it keeps only the newest
//! entries, still in append order.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub speaker: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatHistoryEntry {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// `[HH:MM] speaker: text` with the given strftime format
    pub fn render(&self, time_format: &str) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.with_timezone(&chrono::Local).format(time_format),
            self.speaker,
            self.text
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatLog {
    entries: VecDeque<ChatHistoryEntry>,
    limit: Option<usize>,
}

impl ChatLog {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.filter(|limit| *limit > 0),
        }
    }

    /// Rebuild from stored entries, dropping the oldest beyond `limit`.
    pub fn from_entries(entries: Vec<ChatHistoryEntry>, limit: Option<usize>) -> Self {
        let mut log = Self::new(limit);
        for entry in entries {
            log.push(entry);
        }
        log
    }

    pub fn push(&mut self, entry: ChatHistoryEntry) {
        self.entries.push_back(entry);
        if let Some(limit) = self.limit {
            while self.entries.len() > limit {
                self.entries.pop_front();
            }
        }
    }

    pub fn push_message(&mut self, speaker: &str, text: impl Into<String>) {
        self.push(ChatHistoryEntry::new(speaker, text));
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChatHistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ChatHistoryEntry> {
        self.entries.back()
    }

    pub fn into_vec(self) -> Vec<ChatHistoryEntry> {
        self.entries.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(log: &ChatLog) -> Vec<&str> {
        log.entries().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn unbounded_log_keeps_everything_in_order() {
        let mut log = ChatLog::new(None);
        log.push_message("alice", "create project Alpha");
        log.push_message("Bot", "created project Alpha");
        log.push_message("alice", "thanks");
        assert_eq!(
            texts(&log),
            vec!["create project Alpha", "created project Alpha", "thanks"]
        );
        assert_eq!(log.last().map(|e| e.speaker.as_str()), Some("alice"));
    }

    #[test]
    fn bounded_log_keeps_last_entries() {
        let mut log = ChatLog::new(Some(3));
        for n in 1..=5 {
            log.push_message("alice", n.to_string());
        }
        assert_eq!(texts(&log), vec!["3", "4", "5"]);
    }

    #[test]
    fn zero_limit_means_unbounded() {
        let mut log = ChatLog::new(Some(0));
        for n in 0..10 {
            log.push_message("Bot", n.to_string());
        }
        assert_eq!(log.len(), 10);
    }

    #[test]
    fn from_entries_applies_limit() {
        let entries = (0..4)
            .map(|n| ChatHistoryEntry::new("Bot", n.to_string()))
            .collect();
        let log = ChatLog::from_entries(entries, Some(2));
        assert_eq!(texts(&log), vec!["2", "3"]);
        assert_eq!(log.into_vec().len(), 2);
    }

    #[test]
    fn render_uses_time_format() {
        let entry = ChatHistoryEntry::new("Bot", "hello");
        let rendered = entry.render("%H:%M");
        assert!(rendered.ends_with("] Bot: hello"));
        assert_eq!(rendered.find(']'), Some(6));
    }
}

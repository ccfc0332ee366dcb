//! taskchat - Task and Project Tracking Through Chat
//!
//! This library provides the core of the taskchat CLI: a chat message is
//! classified into an intent, the intent is turned into store mutations
//! against named projects, tasks and users, and the stored data is read
//! back as a nested project tree.
//!
//! # Core Concepts
//!
//! - **Intents**: create/assign/update instructions with loosely-populated
//!   name lists, produced by an external classifier
//! - **Name resolution**: case-insensitive exact matching of human-entered
//!   names to stored ids
//! - **Dispatch**: idempotent creation, assignment and last-write-wins
//!   updates, recovering from lost insert races by re-resolving
//! - **Materialization**: one pass over fan-out join rows into
//!   `Project -> Task -> (comments, attachments, assignees)`
//! - **Sessions**: per-user login state and chat transcript
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `taskchat.toml`
//! - `error`: Error types and result aliases
//! - `model`: Entities and id newtypes
//! - `store`: SQLite store, mutation primitives and the project join
//! - `resolver`: Name to id resolution
//! - `intent`: Intent contract and classifiers
//! - `dispatch`: Command dispatcher
//! - `materialize`: Join rows to nested project tree
//! - `chat`: Chat transcript
//! - `session`: Session storage
//! - `accounts`: Registration and authentication
//! - `service`: Login, message and view flows
//! - `storage`: Data directory layout and JSON file helpers
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON output

pub mod accounts;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod lock;
pub mod materialize;
pub mod model;
pub mod output;
pub mod resolver;
pub mod service;
pub mod session;
pub mod storage;
pub mod store;

pub use error::{Error, Result};

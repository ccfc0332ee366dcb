//! The chat request flow.
//!
//! Login seeds a fresh transcript with the welcome message. Each inbound
//! message is appended, classified, echoed, dispatched, and the dispatcher's
//! messages appended after it. The transcript is saved before dispatch, so a
//! failed dispatch still leaves the user's message and the echo behind.

use serde::Serialize;

use crate::accounts;
use crate::chat::{ChatHistoryEntry, ChatLog};
use crate::config::Config;
use crate::dispatch::{CommandDispatcher, DispatchOutcome};
use crate::error::{Error, Result};
use crate::intent::{Intent, IntentClassifier};
use crate::model::{Project, User, UserId, UserRef};
use crate::session::{Session, SessionStore};
use crate::store::SqliteStore;

pub const REPHRASE: &str = "please rephrase your words and specify an available order";

/// What one inbound message produced
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub message: ChatHistoryEntry,
    pub replies: Vec<ChatHistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DispatchOutcome>,
}

/// Everything the view page shows
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub user: UserRef,
    pub projects: Vec<Project>,
    pub users: Vec<UserRef>,
    pub history: Vec<ChatHistoryEntry>,
}

pub struct ChatService<'a, S: SessionStore + ?Sized> {
    config: &'a Config,
    store: &'a SqliteStore,
    sessions: &'a S,
}

impl<'a, S: SessionStore + ?Sized> ChatService<'a, S> {
    pub fn new(config: &'a Config, store: &'a SqliteStore, sessions: &'a S) -> Self {
        Self {
            config,
            store,
            sessions,
        }
    }

    fn session(&self, id: &str) -> Session<'a, S> {
        Session::new(self.sessions, id)
    }

    fn history_limit(&self) -> Option<usize> {
        self.config.chat.history_limit()
    }

    pub fn register(&self, name: &str, email: &str, password: &str) -> Result<UserId> {
        accounts::register(self.store, name, email, password)
    }

    pub fn login(&self, session_id: &str, name: &str, password: &str) -> Result<User> {
        let user = accounts::authenticate(self.store, name, password)?;
        let session = self.session(session_id);
        session.set_user_id(user.id)?;

        let mut log = ChatLog::new(self.history_limit());
        log.push_message(&self.config.chat.bot_name, self.config.chat.welcome_message.clone());
        session.put_history(&log)?;
        tracing::info!(user = %user.name, session = session_id, "logged in");
        Ok(user)
    }

    pub fn logout(&self, session_id: &str) -> Result<()> {
        let session = self.session(session_id);
        session.clear_user_id()?;
        session.clear_history()?;
        tracing::info!(session = session_id, "logged out");
        Ok(())
    }

    /// The logged-in user of `session_id`.
    pub fn current_user(&self, session_id: &str) -> Result<User> {
        let id = self
            .session(session_id)
            .user_id()?
            .ok_or(Error::NotAuthenticated)?;
        accounts::get(self.store, id)
    }

    pub fn history(&self, session_id: &str) -> Result<ChatLog> {
        self.session(session_id).history(self.history_limit())
    }

    pub fn send_message(
        &self,
        session_id: &str,
        message: &str,
        classifier: &dyn IntentClassifier,
    ) -> Result<ChatTurn> {
        let text = message.trim().replace('"', "'");
        if text.is_empty() {
            return Err(Error::InvalidArgument("message cannot be empty".to_string()));
        }
        let user = self.current_user(session_id)?;
        let session = self.session(session_id);
        let limit = self.history_limit();
        let bot = self.config.chat.bot_name.as_str();

        let inbound = ChatHistoryEntry::new(user.name.as_str(), text.as_str());

        let reply = match classifier.classify(user.id, &text) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(error = %err, user = %user.name, "classifier failed");
                session.append_history(&[inbound], limit)?;
                return Err(err);
            }
        };

        let Some(intent) = reply.intent else {
            let answer = if reply.message.trim().is_empty() {
                REPHRASE.to_string()
            } else {
                reply.message
            };
            let entry = ChatHistoryEntry::new(bot, answer);
            session.append_history(&[inbound.clone(), entry.clone()], limit)?;
            return Ok(ChatTurn {
                message: inbound,
                replies: vec![entry],
                intent: None,
                outcome: None,
            });
        };

        let echo = ChatHistoryEntry::new(bot, format!("{} : {}", intent.summary(), reply.message));
        session.append_history(&[inbound.clone(), echo.clone()], limit)?;

        let outcome = self.dispatch(&intent, &user)?;
        let mut replies = vec![echo];
        replies.extend(
            outcome
                .messages
                .iter()
                .map(|text| ChatHistoryEntry::new(bot, text.as_str())),
        );
        session.append_history(&replies[1..], limit)?;

        Ok(ChatTurn {
            message: inbound,
            replies,
            intent: Some(intent),
            outcome: Some(outcome),
        })
    }

    /// Dispatch an intent without a chat message; only the results are
    /// appended to the transcript.
    pub fn apply_intent(&self, session_id: &str, intent: &Intent) -> Result<DispatchOutcome> {
        let user = self.current_user(session_id)?;
        let outcome = self.dispatch(intent, &user)?;

        let bot = self.config.chat.bot_name.as_str();
        let entries: Vec<ChatHistoryEntry> = outcome
            .messages
            .iter()
            .map(|text| ChatHistoryEntry::new(bot, text.as_str()))
            .collect();
        self.session(session_id)
            .append_history(&entries, self.history_limit())?;
        Ok(outcome)
    }

    fn dispatch(&self, intent: &Intent, user: &User) -> Result<DispatchOutcome> {
        CommandDispatcher::new(self.store)
            .dispatch(intent, user.id)
            .inspect_err(|err| {
                tracing::error!(
                    error = %err,
                    user = %user.name,
                    intent = %intent,
                    "dispatch failed"
                );
            })
    }

    pub fn view(&self, session_id: &str) -> Result<View> {
        let user = self.current_user(session_id)?;
        let projects = self.store.load_projects()?;
        let users = self.store.list_users()?.iter().map(User::to_ref).collect();
        let history = self.history(session_id)?.into_vec();
        Ok(View {
            user: user.to_ref(),
            projects,
            users,
            history,
        })
    }
}

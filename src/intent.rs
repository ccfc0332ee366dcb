//! Structured intents and the classifier that produces them.
//!
//! An intent is the classifier's reading of one chat message: a verb plus
//! loosely-populated lists of names and values. Any list may be missing or
//! null; both mean "empty".

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::model::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Create,
    Assign,
    Update,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::Create => "create",
            IntentKind::Assign => "assign",
            IntentKind::Update => "update",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_kind(value: &str) -> std::result::Result<IntentKind, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "create" => Ok(IntentKind::Create),
        "assign" => Ok(IntentKind::Assign),
        "update" => Ok(IntentKind::Update),
        other => Err(format!(
            "unknown intent '{other}' (expected create, assign or update)"
        )),
    }
}

impl FromStr for IntentKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        parse_kind(value).map_err(Error::InvalidIntent)
    }
}

impl<'de> Deserialize<'de> for IntentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_kind(&raw).map_err(serde::de::Error::custom)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "intent")]
    pub kind: IntentKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub projects: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comments: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub deadline: Vec<String>,
}

impl Intent {
    pub fn new(kind: IntentKind) -> Self {
        Self {
            kind,
            projects: Vec::new(),
            tasks: Vec::new(),
            users: Vec::new(),
            comments: Vec::new(),
            description: Vec::new(),
            deadline: Vec::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| Error::InvalidIntent(err.to_string()))
    }

    /// `intent : [projects] : [tasks] : [users]`, the prefix of the bot's echo
    /// line.
    pub fn summary(&self) -> String {
        format!(
            "{} : [{}] : [{}] : [{}]",
            self.kind,
            self.projects.join(" "),
            self.tasks.join(" "),
            self.users.join(" ")
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// What the classifier says about one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub intent: Option<Intent>,
}

/// Turns free text into an intent. Implementations are opaque collaborators.
pub trait IntentClassifier {
    fn classify(&self, user: UserId, message: &str) -> Result<ClassifierReply>;
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    id: UserId,
    message: &'a str,
}

/// Classifier reached over HTTP: POST `{id, message}`, reply is a
/// [`ClassifierReply`].
pub struct HttpClassifier {
    agent: ureq::Agent,
    url: String,
}

impl HttpClassifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(concat!("taskchat/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl IntentClassifier for HttpClassifier {
    fn classify(&self, user: UserId, message: &str) -> Result<ClassifierReply> {
        let payload = serde_json::to_value(ClassifyRequest { id: user, message })?;
        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
            .send_json(payload)
            .map_err(classifier_error)?;
        let reply: ClassifierReply = serde_json::from_reader(response.into_reader())
            .map_err(|err| Error::Classifier(format!("malformed reply: {err}")))?;
        tracing::debug!(user = %user, intent = ?reply.intent.as_ref().map(|i| i.kind), "classified message");
        Ok(reply)
    }
}

fn classifier_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Status(status, _) => Error::Classifier(format!("http status {status}")),
        ureq::Error::Transport(transport) => Error::Classifier(transport.to_string()),
    }
}

/// Always answers with the same reply. Used when the intent is supplied
/// directly and in tests.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    reply: ClassifierReply,
}

impl StaticClassifier {
    pub fn new(reply: ClassifierReply) -> Self {
        Self { reply }
    }

    pub fn with_intent(intent: Intent) -> Self {
        Self::new(ClassifierReply {
            message: String::new(),
            intent: Some(intent),
        })
    }
}

impl IntentClassifier for StaticClassifier {
    fn classify(&self, _user: UserId, _message: &str) -> Result<ClassifierReply> {
        Ok(self.reply.clone())
    }
}

//! taskchat chat commands: send, apply, history

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::Context;
use crate::chat::ChatHistoryEntry;
use crate::dispatch::DispatchOutcome;
use crate::error::{Error, Result};
use crate::intent::{ClassifierReply, HttpClassifier, Intent, IntentClassifier, StaticClassifier};
use crate::output::{emit_success, HumanOutput};
use crate::service::ChatService;

pub struct SendOptions {
    pub message: String,
    pub intent: Option<PathBuf>,
}

fn read_intent(path: &Path) -> Result<Intent> {
    let raw = std::fs::read_to_string(path)?;
    Intent::from_json(&raw)
}

fn classifier_for(ctx: &Context, intent: Option<&Path>) -> Result<Box<dyn IntentClassifier>> {
    if let Some(path) = intent {
        return Ok(Box::new(StaticClassifier::new(ClassifierReply {
            message: format!("intent from {}", path.display()),
            intent: Some(read_intent(path)?),
        })));
    }
    match &ctx.config.classifier.url {
        Some(url) => Ok(Box::new(HttpClassifier::new(
            url.clone(),
            ctx.config.classifier.timeout(),
        ))),
        None => Err(Error::InvalidConfig(
            "classifier.url is not set; pass --intent <file> instead".to_string(),
        )),
    }
}

fn push_transcript(human: &mut HumanOutput, entries: &[ChatHistoryEntry], time_format: &str) {
    for entry in entries {
        human.push_line("Transcript", entry.render(time_format));
    }
}

fn push_outcome(human: &mut HumanOutput, outcome: &DispatchOutcome) {
    let stats = &outcome.stats;
    let counters = [
        ("projects created", stats.projects_created),
        ("projects reused", stats.projects_reused),
        ("tasks created", stats.tasks_created),
        ("tasks reused", stats.tasks_reused),
        ("comments added", stats.comments_added),
        ("assignments added", stats.assignments_added),
        ("projects updated", stats.projects_updated),
        ("tasks updated", stats.tasks_updated),
        ("skipped", stats.skipped),
    ];
    for (label, count) in counters.into_iter().filter(|(_, count)| *count > 0) {
        human.push_summary(label, count.to_string());
    }
    if outcome.needs_clarification() {
        human.push_warning("the intent was incomplete; see the transcript");
    }
}

pub fn run_send(ctx: &Context, opts: SendOptions) -> Result<()> {
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    let service = ChatService::new(&ctx.config, &store, &sessions);
    let classifier = classifier_for(ctx, opts.intent.as_deref())?;

    let turn = service.send_message(&ctx.session, &opts.message, classifier.as_ref())?;

    let header = match &turn.intent {
        Some(intent) => format!("taskchat chat send: {}", intent.kind),
        None => "taskchat chat send".to_string(),
    };
    let mut human = HumanOutput::new(header);
    if let Some(outcome) = &turn.outcome {
        push_outcome(&mut human, outcome);
    }
    let mut entries = vec![turn.message.clone()];
    entries.extend(turn.replies.iter().cloned());
    push_transcript(&mut human, &entries, &ctx.config.chat.time_format);

    emit_success(ctx.output, "chat send", &turn, Some(&human))
}

pub fn run_apply(ctx: &Context, file: &Path) -> Result<()> {
    let intent = read_intent(file)?;
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    let outcome =
        ChatService::new(&ctx.config, &store, &sessions).apply_intent(&ctx.session, &intent)?;

    let mut human = HumanOutput::new(format!("taskchat chat apply: {}", intent.kind));
    push_outcome(&mut human, &outcome);
    for message in &outcome.messages {
        human.push_line("Messages", message.as_str());
    }
    emit_success(ctx.output, "chat apply", &outcome, Some(&human))
}

#[derive(Serialize)]
struct HistoryReport {
    session: String,
    entries: Vec<ChatHistoryEntry>,
}

pub fn run_history(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    let log = ChatService::new(&ctx.config, &store, &sessions).history(&ctx.session)?;
    let report = HistoryReport {
        session: ctx.session.clone(),
        entries: log.into_vec(),
    };

    let mut human = HumanOutput::new(format!("taskchat chat history: {}", ctx.session));
    human.push_summary("entries", report.entries.len().to_string());
    push_transcript(&mut human, &report.entries, &ctx.config.chat.time_format);
    if report.entries.is_empty() {
        human.push_next_step("taskchat user login <name> --password <password>");
    }
    emit_success(ctx.output, "chat history", &report, Some(&human))
}

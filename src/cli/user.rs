//! taskchat user commands: register, login, logout, whoami

use serde::Serialize;

use super::Context;
use crate::error::Result;
use crate::model::UserId;
use crate::output::{emit_success, HumanOutput};
use crate::service::ChatService;

pub struct RegisterOptions {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub struct LoginOptions {
    pub name: String,
    pub password: String,
}

#[derive(Serialize)]
struct UserReport {
    id: UserId,
    name: String,
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<String>,
}

pub fn run_register(ctx: &Context, opts: RegisterOptions) -> Result<()> {
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    let service = ChatService::new(&ctx.config, &store, &sessions);

    let id = service.register(&opts.name, &opts.email, &opts.password)?;
    let report = UserReport {
        id,
        name: opts.name.trim().to_string(),
        email: opts.email.trim().to_string(),
        session: None,
    };

    let mut human = HumanOutput::new(format!("taskchat user register: {}", report.name));
    human.push_summary("id", id.to_string());
    human.push_summary("email", report.email.clone());
    human.push_next_step(format!(
        "taskchat user login {} --password <password>",
        report.name
    ));
    emit_success(ctx.output, "user register", &report, Some(&human))
}

pub fn run_login(ctx: &Context, opts: LoginOptions) -> Result<()> {
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    let service = ChatService::new(&ctx.config, &store, &sessions);

    let user = service.login(&ctx.session, &opts.name, &opts.password)?;
    let report = UserReport {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        session: Some(ctx.session.clone()),
    };

    let mut human = HumanOutput::new(format!("taskchat user login: {}", user.name));
    human.push_summary("session", ctx.session.clone());
    human.push_line(
        "Transcript",
        format!("{}: {}", ctx.config.chat.bot_name, ctx.config.chat.welcome_message),
    );
    human.push_next_step("taskchat chat send \"<message>\"");
    emit_success(ctx.output, "user login", &report, Some(&human))
}

pub fn run_logout(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    ChatService::new(&ctx.config, &store, &sessions).logout(&ctx.session)?;

    let human = HumanOutput::new(format!("taskchat user logout: session {}", ctx.session));
    emit_success(
        ctx.output,
        "user logout",
        &serde_json::json!({ "session": ctx.session }),
        Some(&human),
    )
}

pub fn run_whoami(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let sessions = ctx.sessions();
    let user = ChatService::new(&ctx.config, &store, &sessions).current_user(&ctx.session)?;
    let report = UserReport {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        session: Some(ctx.session.clone()),
    };

    let mut human = HumanOutput::new(user.name.clone());
    human.push_summary("id", user.id.to_string());
    human.push_summary("email", user.email);
    human.push_summary("session", ctx.session.clone());
    emit_success(ctx.output, "user whoami", &report, Some(&human))
}

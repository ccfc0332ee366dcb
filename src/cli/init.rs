//! taskchat init command implementation
//!
//! Creates the data directory, a default `taskchat.toml` and the database.

use std::path::PathBuf;

use super::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    database: PathBuf,
    sessions: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    database: bool,
}

pub fn run(ctx: &Context) -> Result<()> {
    let database = ctx.storage.store_path(&ctx.config);
    let database_existed = database.exists();

    let created_config = ctx.storage.init(&ctx.config)?;
    ctx.open_store()?;

    let report = InitReport {
        data_dir: ctx.storage.data_dir().to_path_buf(),
        database: database.clone(),
        sessions: ctx.storage.session_dir(&ctx.config),
        created: InitCreated {
            config: created_config,
            database: !database_existed,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push("taskchat.toml");
    }
    if !database_existed {
        created_items.push("database");
    }

    let header = if created_items.is_empty() {
        "taskchat init: nothing to do"
    } else {
        "taskchat init: initialized data directory"
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", report.data_dir.display().to_string());
    human.push_summary("database", database.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("taskchat user register <name> --email <email> --password <password>");
    human.push_next_step("taskchat user login <name> --password <password>");

    emit_success(ctx.output, "init", &report, Some(&human))
}

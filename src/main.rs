//! taskchat - task and project tracking driven by chat
//!
//! Register, log in, and send chat messages; classified intents create,
//! assign and update projects and tasks.

use clap::Parser;
use taskchat::cli::Cli;
use taskchat::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG; an unusable filter falls back to off.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        if err.is_fatal() {
            tracing::error!(command = %command, error = %err, "command failed");
        } else {
            tracing::info!(command = %command, error = %err, "command rejected");
        }
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}

//! Command-line interface for taskchat
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group lives in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::session::{FileSessionStore, DEFAULT_SESSION};
use crate::storage::{self, Storage, DATA_DIR_ENV};
use crate::store::SqliteStore;

mod chat;
mod init;
mod user;
mod view;

/// taskchat - projects and tasks managed through chat
///
/// Register and log in, then send chat messages; the classifier turns them
/// into create/assign/update intents applied to your projects.
#[derive(Parser, Debug)]
#[command(name = "taskchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding config, database and sessions
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Session name (one login and transcript per session)
    #[arg(long, global = true, env = "TASKCHAT_SESSION", default_value = DEFAULT_SESSION)]
    pub session: String,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, default config and database
    Init,

    /// Accounts and login
    #[command(subcommand)]
    User(UserCommands),

    /// Chat with the task manager
    #[command(subcommand)]
    Chat(ChatCommands),

    /// Show all projects with their tasks, plus the chat transcript
    View,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Register a new user
    Register {
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "TASKCHAT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in, starting a fresh transcript
    Login {
        name: String,

        #[arg(long, env = "TASKCHAT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and drop the transcript
    Logout,

    /// Show the logged-in user
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum ChatCommands {
    /// Send a message through the classifier and apply the resulting intent
    Send {
        message: String,

        /// Use the intent in this JSON file instead of asking the classifier
        #[arg(long)]
        intent: Option<PathBuf>,
    },

    /// Apply an intent JSON file directly
    Apply { file: PathBuf },

    /// Print the transcript
    History,
}

/// Resolved data dir, config and output flags shared by every command
pub(crate) struct Context {
    pub storage: Storage,
    pub config: Config,
    pub session: String,
    pub output: OutputOptions,
}

impl Context {
    fn new(cli: &Cli) -> Result<Self> {
        let data_dir = match &cli.data_dir {
            Some(dir) => dir.clone(),
            None => storage::default_data_dir()?,
        };
        let storage = Storage::new(data_dir);
        let config = storage.load_config()?;
        Ok(Self {
            storage,
            config,
            session: cli.session.clone(),
            output: OutputOptions {
                json: cli.json,
                quiet: cli.quiet,
            },
        })
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(
            self.storage.store_path(&self.config),
            self.config.store.busy_timeout(),
        )
    }

    pub fn sessions(&self) -> FileSessionStore {
        FileSessionStore::new(
            self.storage.clone(),
            self.storage.session_dir(&self.config),
            self.config.session.lock_timeout_ms,
        )
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::new(&self)?;
        match self.command {
            Commands::Init => init::run(&ctx),
            Commands::User(cmd) => match cmd {
                UserCommands::Register {
                    name,
                    email,
                    password,
                } => user::run_register(
                    &ctx,
                    user::RegisterOptions {
                        name,
                        email,
                        password,
                    },
                ),
                UserCommands::Login { name, password } => {
                    user::run_login(&ctx, user::LoginOptions { name, password })
                }
                UserCommands::Logout => user::run_logout(&ctx),
                UserCommands::Whoami => user::run_whoami(&ctx),
            },
            Commands::Chat(cmd) => match cmd {
                ChatCommands::Send { message, intent } => {
                    chat::run_send(&ctx, chat::SendOptions { message, intent })
                }
                ChatCommands::Apply { file } => chat::run_apply(&ctx, &file),
                ChatCommands::History => chat::run_history(&ctx),
            },
            Commands::View => view::run(&ctx),
        }
    }
}

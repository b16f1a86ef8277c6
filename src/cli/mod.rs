//! CLI module: command parsing and dispatch
//!
//! All CLI logic lives here. `main.rs` calls `cli::run()`.

pub mod chat;
pub mod common;
pub mod config;
pub mod history;
pub mod tools;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "turnstile")]
#[command(version)]
#[command(about = "Per-user message coalescing for conversational generation", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.turnstile/config.json
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively; lines typed during a reply are coalesced
    Chat {
        /// User id to chat as
        #[arg(short, long, default_value = "cli")]
        user: String,
        /// Also print tool calls and tool results
        #[arg(short, long)]
        verbose: bool,
    },
    /// Inspect or clear stored conversations
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// List the tools offered to the model
    Tools {
        /// Print each tool's JSON parameter schema
        #[arg(long)]
        schema: bool,
    },
    /// Show the effective configuration (API key redacted)
    Config {
        /// Validate the config file instead of printing it
        #[arg(long)]
        check: bool,
    },
    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List users with stored conversations
    List,
    /// Print a user's conversation
    Show {
        /// User id
        user: String,
    },
    /// Delete a user's conversation
    Clear {
        /// User id
        user: String,
    },
}

/// Parse arguments and run the selected command.
pub async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config_path = cli.config_path.as_deref();

    // Logging follows the config file when it is readable; defaults otherwise.
    let logging_cfg = common::read_config(config_path)
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = turnstile::utils::init_logging(&logging_cfg) {
        eprintln!("Warning: {}", e);
    }

    match cli.command {
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
        }
        Some(Commands::Chat { user, verbose }) => {
            chat::cmd_chat(config_path, &user, verbose).await?;
        }
        Some(Commands::History { action }) => {
            history::cmd_history(config_path, action).await?;
        }
        Some(Commands::Tools { schema }) => {
            tools::cmd_tools(schema)?;
        }
        Some(Commands::Config { check }) => {
            config::cmd_config(config_path, check)?;
        }
        Some(Commands::Version) => {
            cmd_version();
        }
    }

    Ok(())
}

fn cmd_version() {
    println!("turnstile {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Per-user message coalescing for conversational generation");
}

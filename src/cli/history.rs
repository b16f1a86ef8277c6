//! History command handlers.

use std::path::Path;

use anyhow::{Context, Result};

use turnstile::history::HistoryStore;

use super::common::{history_store, read_config};
use super::HistoryAction;

pub(crate) async fn cmd_history(config_path: Option<&Path>, action: HistoryAction) -> Result<()> {
    let config = read_config(config_path)?;
    let store = history_store(&config)?;

    match action {
        HistoryAction::List => {
            let users = store.users().await.context("Failed to list conversations")?;
            if users.is_empty() {
                println!("No stored conversations.");
                return Ok(());
            }
            for user in users {
                let turns = store.fetch_history(&user).await?.len();
                println!("  {:<32} {} turn(s)", user, turns);
            }
        }
        HistoryAction::Show { user } => {
            let turns = store
                .fetch_history(&user)
                .await
                .with_context(|| format!("Failed to read conversation for '{}'", user))?;
            if turns.is_empty() {
                println!("No conversation stored for '{}'.", user);
                return Ok(());
            }
            for turn in turns {
                match turn.tool_calls.as_deref() {
                    Some(calls) if !calls.is_empty() => {
                        let names: Vec<&str> =
                            calls.iter().map(|c| c.function_name.as_str()).collect();
                        println!("{}: [calls {}] {}", turn.role, names.join(", "), turn.content);
                    }
                    _ => println!("{}: {}", turn.role, turn.content),
                }
            }
        }
        HistoryAction::Clear { user } => {
            store
                .clear(&user)
                .await
                .with_context(|| format!("Failed to clear conversation for '{}'", user))?;
            println!("Cleared conversation for '{}'.", user);
        }
    }

    Ok(())
}

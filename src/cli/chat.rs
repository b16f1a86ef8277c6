//! Interactive chat command.
//!
//! Lines read from stdin are published to the bus as they arrive, so lines
//! typed while a reply is being generated join that generation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use turnstile::agent::Dispatcher;
use turnstile::bus::{InboundMessage, MessageBus, OutboundMessage};
use turnstile::history::Role;
use turnstile::log_component;

use super::common::{build_coordinator, load_config};

pub(crate) async fn cmd_chat(config_path: Option<&Path>, user: &str, verbose: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let coordinator = build_coordinator(&config)?;

    let bus = Arc::new(MessageBus::with_buffer_size(config.bus.buffer_size));
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(coordinator), Arc::clone(&bus)));

    let runner = Arc::clone(&dispatcher);
    let handle = tokio::spawn(async move { runner.start().await });
    while !dispatcher.is_running() && !handle.is_finished() {
        tokio::task::yield_now().await;
    }

    log_component!(info, "cli", "Chat session started", user_id = user);
    println!("Turnstile chat as '{}'", user);
    println!("Type your message and press Enter. Type 'quit' or 'exit' to stop.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "quit" || input == "exit" {
                    break;
                }
                bus.publish_inbound(InboundMessage::new(user, input).with_metadata("source", "cli"))
                    .await?;
            }
            Some(out) = bus.consume_outbound() => {
                print_outbound(&out, verbose);
            }
        }
    }

    shutdown(&dispatcher, handle, &bus, |out| print_outbound(out, verbose)).await?;

    println!("Goodbye!");
    Ok(())
}

/// Stop the dispatcher and wait for it to finish, handing every remaining
/// reply to `emit`. Outbound is drained while waiting so no in-flight
/// generation blocks on a full queue.
async fn shutdown(
    dispatcher: &Dispatcher,
    mut handle: JoinHandle<turnstile::Result<()>>,
    bus: &MessageBus,
    mut emit: impl FnMut(&OutboundMessage),
) -> Result<()> {
    dispatcher.stop();
    loop {
        tokio::select! {
            result = &mut handle => {
                result??;
                break;
            }
            Some(out) = bus.consume_outbound() => emit(&out),
        }
    }
    while let Some(out) = bus.try_consume_outbound() {
        emit(&out);
    }
    Ok(())
}

fn print_outbound(out: &OutboundMessage, verbose: bool) {
    for turn in &out.turns {
        match turn.role {
            Role::Assistant if turn.has_tool_calls() => {
                if verbose {
                    for call in turn.tool_calls.iter().flatten() {
                        println!("  [tool call] {}({})", call.function_name, call.arguments);
                    }
                }
            }
            Role::Tool => {
                if verbose {
                    println!(
                        "  [tool result] {}: {}",
                        turn.tool_call_id.as_deref().unwrap_or("?"),
                        turn.content
                    );
                }
            }
            Role::Assistant => {
                println!("{}", turn.content);
                println!();
            }
            Role::System | Role::User => {}
        }
    }
}

//! Dispatcher: moves inbound messages through the coordinator and publishes
//! outcomes on the bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::bus::{InboundMessage, MessageBus, OutboundMessage};
use crate::error::{Result, TurnstileError};
use crate::history::Turn;
use crate::processor::Submission;

use super::GenerationCoordinator;

/// Consumes the bus inbound queue.
///
/// Each message is persisted as a user turn and submitted to the
/// coordinator from the consume loop itself, so both history and the pending
/// buffer see messages in arrival order. Only a submission that wins the
/// user's gate is spawned as a task; it generates, persists the outcome and
/// publishes it outbound.
pub struct Dispatcher {
    coordinator: Arc<GenerationCoordinator>,
    bus: Arc<MessageBus>,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Dispatcher {
    pub fn new(coordinator: Arc<GenerationCoordinator>, bus: Arc<MessageBus>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            coordinator,
            bus,
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn coordinator(&self) -> &Arc<GenerationCoordinator> {
        &self.coordinator
    }

    /// Run until [`stop`](Self::stop) is called or the inbound queue closes.
    ///
    /// Messages already queued when `stop` is called are still dispatched,
    /// and in-flight message tasks are awaited before returning.
    ///
    /// # Errors
    /// Returns an error if the dispatcher is already running.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TurnstileError::Config("Dispatcher already running".into()));
        }
        info!("Starting dispatcher");

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let _ = *shutdown_rx.borrow_and_update();
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                // Queued messages are drained before shutdown is honored.
                biased;

                msg = self.bus.consume_inbound() => {
                    let Some(msg) = msg else {
                        info!("Inbound channel closed");
                        break;
                    };
                    debug!(user_id = %msg.user_id, "Dispatching message");
                    let submission = accept(&self.coordinator, &msg).await;
                    if submission.is_deferred() {
                        debug!(user_id = %msg.user_id, "Joined running generation");
                    } else {
                        tasks.spawn(generate(
                            Arc::clone(&self.coordinator),
                            Arc::clone(&self.bus),
                            msg.user_id,
                            submission,
                        ));
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Message task aborted");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Received shutdown signal");
                        break;
                    }
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Message task aborted");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Dispatcher stopped");
        Ok(())
    }

    /// Signal the dispatch loop to stop.
    pub fn stop(&self) {
        info!("Stopping dispatcher");
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);
    }
}

/// Persist the user turn, then buffer the message. Runs in arrival order.
async fn accept(coordinator: &GenerationCoordinator, msg: &InboundMessage) -> Submission {
    let user_id = msg.user_id.as_str();
    if let Err(e) = coordinator
        .history()
        .append(user_id, &[Turn::user(&msg.content)])
        .await
    {
        warn!(user_id, error = %e, "Failed to persist user turn");
    }
    coordinator.submit(user_id, &msg.content)
}

/// Drive a gated submission, then persist and publish its outcome.
async fn generate(
    coordinator: Arc<GenerationCoordinator>,
    bus: Arc<MessageBus>,
    user_id: String,
    submission: Submission,
) {
    let Some(turns) = coordinator.run_submission(&user_id, submission).await else {
        return;
    };

    if let Err(e) = coordinator.history().append(&user_id, &turns).await {
        warn!(user_id = %user_id, error = %e, "Failed to persist outcome turns");
    }

    if let Err(e) = bus.publish_outbound(OutboundMessage::new(&user_id, turns)).await {
        error!(user_id = %user_id, error = %e, "Failed to publish outbound message");
    }
}

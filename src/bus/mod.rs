//! Message Bus Module
//!
//! The `MessageBus` carries inbound user messages to the dispatcher and
//! generation outcomes back to the transport.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │────>│  MessageBus │────>│ Dispatcher  │
//! │   (CLI)     │     │  (inbound)  │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            │ outbound
//!                            ▼
//! ┌─────────────┐     ┌─────────────┐
//! │  Transport  │<────│  MessageBus │
//! │   (CLI)     │     │  (outbound) │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use turnstile::bus::{InboundMessage, MessageBus};
//!
//! # tokio_test::block_on(async {
//! let bus = MessageBus::new();
//! bus.publish_inbound(InboundMessage::new("user-1", "Hello")).await.unwrap();
//!
//! let received = bus.consume_inbound().await.unwrap();
//! assert_eq!(received.content, "Hello");
//! # });
//! ```

pub mod message;

pub use message::{InboundMessage, OutboundMessage};

use crate::error::{Result, TurnstileError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

const DEFAULT_BUFFER_SIZE: usize = 100;

/// Bounded inbound/outbound queues shared by clones.
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: Arc<Mutex<mpsc::Receiver<InboundMessage>>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: Arc<Mutex<mpsc::Receiver<OutboundMessage>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Create a bus whose queues each hold up to `buffer_size` messages.
    ///
    /// A zero size is raised to one.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size.max(1));

        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
        }
    }

    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<()> {
        self.inbound_tx
            .send(msg)
            .await
            .map_err(|_| TurnstileError::BusClosed)
    }

    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        self.inbound_rx.lock().await.recv().await
    }

    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<()> {
        self.outbound_tx
            .send(msg)
            .await
            .map_err(|_| TurnstileError::BusClosed)
    }

    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        self.outbound_rx.lock().await.recv().await
    }

    /// Take an outbound message if one is ready, without waiting.
    pub fn try_consume_outbound(&self) -> Option<OutboundMessage> {
        self.outbound_rx.try_lock().ok()?.try_recv().ok()
    }

    pub fn inbound_sender(&self) -> mpsc::Sender<InboundMessage> {
        self.inbound_tx.clone()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MessageBus {
    fn clone(&self) -> Self {
        Self {
            inbound_tx: self.inbound_tx.clone(),
            inbound_rx: Arc::clone(&self.inbound_rx),
            outbound_tx: self.outbound_tx.clone(),
            outbound_rx: Arc::clone(&self.outbound_rx),
        }
    }
}

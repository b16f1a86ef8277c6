//! Message types for the Turnstile message bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::history::{Role, Turn};

/// One message received from a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The sending user
    pub user_id: String,
    /// Message text
    pub content: String,
    /// When the transport received the message
    pub received_at: DateTime<Utc>,
    /// Transport-specific metadata (message ids, channel names, ...)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    /// Create an inbound message stamped with the current time.
    ///
    /// # Example
    /// ```
    /// use turnstile::bus::InboundMessage;
    ///
    /// let msg = InboundMessage::new("user-1", "Hello").with_metadata("source", "cli");
    /// assert_eq!(msg.metadata.get("source").map(String::as_str), Some("cli"));
    /// ```
    pub fn new(user_id: &str, content: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            content: content.to_string(),
            received_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// A generation outcome to deliver to a user, turns in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The receiving user
    pub user_id: String,
    /// Outcome turns, in delivery order
    pub turns: Vec<Turn>,
}

impl OutboundMessage {
    pub fn new(user_id: &str, turns: Vec<Turn>) -> Self {
        Self {
            user_id: user_id.to_string(),
            turns,
        }
    }

    /// The final assistant reply, if any.
    pub fn reply(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::Assistant && !t.has_tool_calls())
            .map(|t| t.content.as_str())
    }
}

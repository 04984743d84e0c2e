//! Append-only log of chat between the player and the agent.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Author {
    /// The local player.
    Human,
    /// The server-hosted agent.
    Agent,
}

/// One chat record.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct Message {
    /// Author of the message.
    author: Author,
    /// Message body.
    text: String,
    /// Query id: assigned on outbound queries, echoed on replies when the server supports it.
    request_id: Option<u64>,
}

/// Ordered chat history for one game.
///
/// Records are kept in arrival order. Replies are never reordered to match
/// the query they answer; `request_id` is informational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentaryLog {
    messages: Vec<Message>,
}

impl CommentaryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Records in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Records as a slice.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing has been said.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

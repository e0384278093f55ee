//! Conversation entries and their identifiers
//!
//! These types are UI-agnostic; the TUI and tests share them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a message, used as its render key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Ai => "Assistant",
        }
    }
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            sender: Sender::User,
        }
    }

    pub fn ai(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            sender: Sender::Ai,
        }
    }
}

/// Monotonic id source for one session.
///
/// Ids come from a counter rather than a clock, so a question and its answer
/// created within the same instant still get distinct, ordered ids.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> MessageId {
        self.next += 1;
        MessageId(self.next)
    }

    /// Reserve the ids of a question and its answer in one step
    pub fn reserve_pair(&mut self) -> (MessageId, MessageId) {
        let question = self.next_id();
        let answer = self.next_id();
        (question, answer)
    }
}

//! Append-only message log for the current session

use crate::message::Message;

/// Ordered conversation log.
///
/// Insertion order is display order. Entries are never mutated, removed, or
/// reordered once appended.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        debug_assert!(
            self.messages.last().map_or(true, |last| last.id < message.id),
            "message ids must be strictly increasing"
        );
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

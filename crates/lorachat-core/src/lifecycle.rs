//! Request lifecycle: at most one question in flight
//!
//! `ChatState` is the single owned state object of a session. The event loop
//! mutates it only through [`ChatState::submit`] and [`ChatState::settle`];
//! the transport call in between runs as [`PendingQuery::run`].

use crate::conversation::Conversation;
use crate::message::{IdGenerator, Message, MessageId};
use crate::transport::{Transport, TransportError};

/// Answer shown when the endpoint could not produce one
pub const FALLBACK_MESSAGE: &str = "Sorry, an error occurred.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    /// Waiting on the answer that will be stored under `reply_id`
    Pending { reply_id: MessageId },
}

/// A submitted question that still has to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub reply_id: MessageId,
    pub query: String,
}

impl PendingQuery {
    pub async fn run(self, transport: &dyn Transport) -> Completion {
        tracing::info!(reply = %self.reply_id, chars = self.query.chars().count(), "sending query");
        let outcome = transport.send(&self.query).await;
        Completion {
            reply_id: self.reply_id,
            outcome,
        }
    }
}

/// Result of a finished transport call, tagged with the reserved reply id
#[derive(Debug)]
pub struct Completion {
    pub reply_id: MessageId,
    pub outcome: Result<String, TransportError>,
}

#[derive(Debug, Default)]
pub struct ChatState {
    conversation: Conversation,
    ids: IdGenerator,
    request: RequestState,
    pub input: String,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn request(&self) -> RequestState {
        self.request
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.request, RequestState::Pending { .. })
    }

    /// Whether pressing Enter right now would send something
    pub fn can_submit(&self) -> bool {
        !self.is_pending() && !self.input.trim().is_empty()
    }

    /// Turn the current input into a question.
    ///
    /// Blank input and submits while a request is pending are no-ops. On
    /// success the question is logged, the input cleared, and the state moves
    /// to pending.
    pub fn submit(&mut self) -> Option<PendingQuery> {
        if let RequestState::Pending { reply_id } = self.request {
            tracing::debug!(%reply_id, "submit ignored while a request is pending");
            return None;
        }
        if self.input.trim().is_empty() {
            return None;
        }

        let query = std::mem::take(&mut self.input);
        let (question_id, reply_id) = self.ids.reserve_pair();
        self.conversation.append(Message::user(question_id, query.clone()));
        self.request = RequestState::Pending { reply_id };

        Some(PendingQuery { reply_id, query })
    }

    /// Record the answer (or the fallback) for the pending question.
    ///
    /// Returns the id of the appended message, or `None` when the completion
    /// does not belong to the pending request.
    pub fn settle(&mut self, completion: Completion) -> Option<MessageId> {
        match self.request {
            RequestState::Pending { reply_id } if reply_id == completion.reply_id => {}
            _ => {
                tracing::warn!(reply = %completion.reply_id, "completion has no matching pending request");
                return None;
            }
        }

        let content = match completion.outcome {
            Ok(answer) => {
                tracing::info!(reply = %completion.reply_id, chars = answer.chars().count(), "answer received");
                answer
            }
            Err(err) => {
                tracing::warn!(reply = %completion.reply_id, error = %err, "chat request failed");
                FALLBACK_MESSAGE.to_string()
            }
        };

        self.conversation.append(Message::ai(completion.reply_id, content));
        self.request = RequestState::Idle;
        Some(completion.reply_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Sender;
    use pretty_assertions::assert_eq;

    fn typed(text: &str) -> ChatState {
        let mut state = ChatState::new();
        state.input = text.to_string();
        state
    }

    #[test]
    fn blank_input_is_ignored() {
        for text in ["", "   ", "\t\n "] {
            let mut state = typed(text);
            assert!(state.submit().is_none());
            assert!(state.messages().is_empty());
            assert_eq!(state.request(), RequestState::Idle);
            assert_eq!(state.input, text);
        }
    }

    #[test]
    fn submit_appends_question_and_goes_pending() {
        let mut state = typed("What is a spreading factor?");
        let pending = state.submit().expect("query");

        assert_eq!(pending.query, "What is a spreading factor?");
        assert!(state.input.is_empty());
        assert!(state.is_pending());
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].sender, Sender::User);
        assert!(state.messages()[0].id < pending.reply_id);
    }

    #[test]
    fn question_keeps_input_as_typed() {
        let mut state = typed("  hello  ");
        let pending = state.submit().expect("query");
        assert_eq!(pending.query, "  hello  ");
        assert_eq!(state.messages()[0].content, "  hello  ");
    }

    #[test]
    fn submit_while_pending_is_ignored() {
        let mut state = typed("first");
        state.submit().expect("query");

        state.input = "second".to_string();
        assert!(!state.can_submit());
        assert!(state.submit().is_none());
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.input, "second");
    }

    #[test]
    fn successful_settle_appends_answer() {
        let mut state = typed("hi");
        let pending = state.submit().expect("query");

        let id = state.settle(Completion {
            reply_id: pending.reply_id,
            outcome: Ok("Hello".to_string()),
        });

        assert_eq!(id, Some(pending.reply_id));
        assert_eq!(state.request(), RequestState::Idle);
        let last = state.conversation().last().expect("answer");
        assert_eq!(last.sender, Sender::Ai);
        assert_eq!(last.content, "Hello");
    }

    #[test]
    fn failed_settle_appends_fallback() {
        let mut state = typed("hi");
        let pending = state.submit().expect("query");

        state.settle(Completion {
            reply_id: pending.reply_id,
            outcome: Err(TransportError::Status {
                status: 500,
                body: "Internal Server Error".to_string(),
            }),
        });

        let last = state.conversation().last().expect("answer");
        assert_eq!(last.content, FALLBACK_MESSAGE);
        assert!(!state.is_pending());
    }

    #[test]
    fn stray_completion_is_ignored() {
        let mut state = typed("hi");
        let pending = state.submit().expect("query");
        state.settle(Completion {
            reply_id: pending.reply_id,
            outcome: Ok("one".to_string()),
        });

        let again = state.settle(Completion {
            reply_id: pending.reply_id,
            outcome: Ok("two".to_string()),
        });

        assert_eq!(again, None);
        assert_eq!(state.messages().len(), 2);
    }

    #[test]
    fn idle_again_after_settle_accepts_next_question() {
        let mut state = typed("one");
        let first = state.submit().expect("query");
        state.settle(Completion {
            reply_id: first.reply_id,
            outcome: Ok("1".to_string()),
        });

        state.input = "two".to_string();
        let second = state.submit().expect("query");
        assert!(second.reply_id > first.reply_id);
        assert_eq!(state.messages().len(), 3);
    }
}

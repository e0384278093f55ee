use std::sync::Arc;

use lorachat_core::{ChatState, Completion, Transport};
use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::scroll::ScrollCoordinator;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub chat: ChatState,
    /// Cursor position in `chat.input`, in characters
    pub input_cursor: usize,
    pub scroll: ScrollCoordinator,

    // Animation state
    pub animation_frame: u8, // 0-2 for the typing indicator dots

    // Conversation pane, recorded during render for mouse hit-testing
    pub chat_area: Option<Rect>,

    pub endpoint: String,
    transport: Arc<dyn Transport>,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            chat: ChatState::new(),
            input_cursor: 0,
            scroll: ScrollCoordinator::new(),
            animation_frame: 0,
            chat_area: None,
            endpoint: endpoint.into(),
            transport,
            events,
        }
    }

    /// Send the typed question, unless it is blank or another one is pending.
    ///
    /// The transport call runs in its own task and reports back through the
    /// event channel as [`AppEvent::QueryFinished`].
    pub fn submit(&mut self) {
        let Some(pending) = self.chat.submit() else {
            return;
        };
        self.input_cursor = 0;
        self.animation_frame = 0;

        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        tokio::spawn(async move {
            let completion = pending.run(transport.as_ref()).await;
            if events.send(AppEvent::QueryFinished(completion)).is_err() {
                tracing::debug!("event loop closed before the answer arrived");
            }
        });
    }

    pub fn finish_query(&mut self, completion: Completion) {
        self.chat.settle(completion);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.chat.input, self.input_cursor);
        self.chat.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn delete_before_cursor(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.chat.input, self.input_cursor);
            self.chat.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.input_cursor < self.chat.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.chat.input, self.input_cursor);
            self.chat.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.chat.input.chars().count();
        self.input_cursor = (self.input_cursor + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.chat.input.chars().count();
    }
}

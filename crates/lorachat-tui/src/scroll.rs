//! Pin-to-bottom scrolling for the conversation pane

/// Tracks the vertical offset of the conversation pane.
///
/// [`ScrollCoordinator::sync`] is called from the draw pass once the
/// conversation lines are laid out. Whenever the message count changed since
/// the previous frame, the newest message is brought fully into view.
#[derive(Debug, Clone, Default)]
pub struct ScrollCoordinator {
    offset: u16,
    max_offset: u16,
    viewport_height: u16,
    observed_len: usize,
}

impl ScrollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the offset with the current layout and return it.
    pub fn sync(&mut self, log_len: usize, content_lines: usize, viewport_height: u16) -> u16 {
        let was_at_bottom = self.is_at_bottom();
        let max_offset = content_lines
            .saturating_sub(viewport_height as usize)
            .min(u16::MAX as usize) as u16;

        self.max_offset = max_offset;
        self.viewport_height = viewport_height;

        if log_len != self.observed_len || was_at_bottom {
            if log_len != self.observed_len {
                tracing::trace!(log_len, max_offset, "conversation changed, pinning to bottom");
            }
            self.observed_len = log_len;
            self.offset = max_offset;
        } else {
            self.offset = self.offset.min(max_offset);
        }

        self.offset
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn max_offset(&self) -> u16 {
        self.max_offset
    }

    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.offset = self.offset.saturating_add(lines).min(self.max_offset);
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.viewport_height / 2).max(1));
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.viewport_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset;
    }
}

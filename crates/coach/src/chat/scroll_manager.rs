/// Distance from the tail within which the view still counts as "at bottom".
pub const VIEWING_HISTORY_THRESHOLD: f32 = 50.0;

/// Instruction for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollCommand {
    ScrollToEnd,
}

/// Returns true when the visible window reaches the tail of the content.
pub fn is_at_bottom(offset: f32, content_height: f32, viewport_height: f32) -> bool {
    offset >= content_height - viewport_height - VIEWING_HISTORY_THRESHOLD
}

/// Auto-follow policy for the message list, independent from message content.
///
/// Growth of the transcript queues at most one scroll-to-end, and only while
/// the user is not browsing history. Explicit requests are always honored.
#[derive(Debug, Clone)]
pub struct ScrollManager {
    viewing_history: bool,
    pending_scroll_to_end: bool,
    last_message_count: usize,
}

impl ScrollManager {
    /// Starts following with one queued scroll so the seeded messages are visible.
    pub fn new(initial_message_count: usize) -> Self {
        Self {
            viewing_history: false,
            pending_scroll_to_end: true,
            last_message_count: initial_message_count,
        }
    }

    pub fn is_viewing_history(&self) -> bool {
        self.viewing_history
    }

    /// Whether the "jump to latest" affordance should be shown.
    pub fn shows_jump_to_latest(&self) -> bool {
        self.viewing_history
    }

    /// Records the latest scroll geometry reported by the view.
    pub fn observe_viewport_position(
        &mut self,
        offset: f32,
        content_height: f32,
        viewport_height: f32,
    ) -> bool {
        let at_bottom = is_at_bottom(offset, content_height, viewport_height);
        if self.viewing_history == at_bottom {
            tracing::trace!(viewing_history = !at_bottom, "viewport follow state changed");
        }
        self.viewing_history = !at_bottom;
        at_bottom
    }

    /// Explicit user request. Honored regardless of the viewing flag.
    pub fn request_scroll_to_end(&mut self) {
        self.pending_scroll_to_end = true;
        self.viewing_history = false;
    }

    /// Notes the current transcript length, queuing a follow scroll on growth.
    pub fn on_transcript_len(&mut self, message_count: usize) {
        let grew = message_count > self.last_message_count;
        self.last_message_count = message_count;

        if grew && !self.viewing_history {
            self.pending_scroll_to_end = true;
        }
    }

    /// Hands out the queued scroll, if any. Each queued scroll is yielded once.
    pub fn take_scroll_command(&mut self) -> Option<ScrollCommand> {
        if std::mem::take(&mut self.pending_scroll_to_end) {
            Some(ScrollCommand::ScrollToEnd)
        } else {
            None
        }
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new(0)
    }
}

//! Viewer application state.
//!
//! `AppState` is the single state root for the interactive consumer. Key
//! handlers and stream events mutate it through small methods; rendering
//! reads it. The stream side only ever *feeds* this state — derived views
//! (search, layout, window) never write back into the connection.

pub mod auto_scroll;
pub mod search;

pub use auto_scroll::{AutoScrollController, ScrollMode};
pub use search::SearchState;

use crate::model::LineBuffer;
use crate::stream::{ConnectionState, StreamEvent};
use crate::view_state::height::{LayoutParams, RowLayout};

/// Input mode for the viewer: browsing the buffer or typing a search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Normal key handling.
    Browsing,
    /// The search bar is open and capturing keystrokes.
    TypingSearch {
        /// Term under construction; committed with Enter.
        pending: String,
    },
}

/// State root for the interactive viewer.
#[derive(Debug)]
pub struct AppState {
    /// All decoded lines received on the current connection.
    pub buffer: LineBuffer,
    /// Search term, matches, and cursor.
    pub search: SearchState,
    /// Row heights and prefix sums for the current container width.
    pub layout: RowLayout,
    auto_scroll: AutoScrollController,
    scroll_offset: usize,
    viewport_height: usize,
    connection: ConnectionState,
    input_mode: InputMode,
    /// Raised by appends while pinned; resolved by the renderer next frame.
    follow_pending: bool,
    timestamps: bool,
}

impl AppState {
    /// Fresh state for a new connection.
    pub fn new(content_width: usize, viewport_height: usize, timestamps: bool) -> Self {
        Self {
            buffer: LineBuffer::new(),
            search: SearchState::new(),
            layout: RowLayout::new(LayoutParams::terminal(content_width)),
            auto_scroll: AutoScrollController::new(),
            scroll_offset: 0,
            viewport_height,
            connection: ConnectionState::Connecting,
            input_mode: InputMode::Browsing,
            follow_pending: false,
            timestamps,
        }
    }

    // ===== Stream feeding =====

    /// Apply one connection event.
    pub fn apply_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Opened => self.connection = ConnectionState::Connected,
            StreamEvent::Line(text) => self.append_line(text),
            StreamEvent::Failed { reason } => {
                self.connection = ConnectionState::Errored { reason };
            }
            StreamEvent::Closed {
                clean,
                code,
                reason,
            } => {
                self.connection = ConnectionState::Closed {
                    clean,
                    code,
                    reason,
                };
            }
        }
    }

    /// Append one decoded line: buffer, layout, and search index move in
    /// lockstep. While pinned, schedules (not performs) a follow.
    pub fn append_line(&mut self, text: String) {
        self.layout.push_line(&text);
        self.buffer.append(text);
        self.search.scan_appended(&self.buffer);
        if self.auto_scroll.is_pinned() {
            self.follow_pending = true;
        }
    }

    /// Current connection state, as last reported by the stream.
    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Reset for a recreated connection (e.g. the timestamps toggle).
    ///
    /// The buffer, layout, and scroll position start over; the search term
    /// survives and rescans the (now empty) buffer.
    pub fn reset_stream(&mut self, timestamps: bool) {
        self.buffer = LineBuffer::new();
        let width = self.layout.params().container_width;
        self.layout = RowLayout::new(LayoutParams::terminal(width));
        let term = self.search.term().to_string();
        self.search = SearchState::new();
        self.search.set_term(term, &self.buffer);
        self.auto_scroll = AutoScrollController::new();
        self.scroll_offset = 0;
        self.follow_pending = false;
        self.connection = ConnectionState::Connecting;
        self.timestamps = timestamps;
    }

    /// Whether server-side timestamps are currently requested.
    pub fn timestamps(&self) -> bool {
        self.timestamps
    }

    // ===== Scrolling =====

    /// Current scroll offset in layout units.
    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Viewport height in layout units.
    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    /// Auto-scroll mode.
    pub fn scroll_mode(&self) -> ScrollMode {
        self.auto_scroll.mode()
    }

    /// Largest valid scroll offset for the current content.
    pub fn max_scroll_offset(&self) -> usize {
        self.layout
            .total_extent()
            .saturating_sub(self.viewport_height)
    }

    /// Resolve a scheduled follow, if one is pending.
    ///
    /// Called by the renderer at the start of a frame, after appends have
    /// been laid out; this is the second phase of the deferred
    /// scroll-to-bottom.
    pub fn apply_pending_follow(&mut self) {
        if self.follow_pending {
            self.scroll_offset = self.max_scroll_offset();
            self.follow_pending = false;
        }
    }

    /// True if a follow is scheduled for the next frame.
    pub fn follow_pending(&self) -> bool {
        self.follow_pending
    }

    /// Schedule a follow for the next frame.
    ///
    /// Renderer hook: height corrections during a draw can move the bottom,
    /// and a pinned viewport must track it on the following frame.
    pub fn schedule_follow(&mut self) {
        self.follow_pending = true;
    }

    /// A manual scroll to `offset` (clamped); re-evaluates auto-scroll.
    pub fn manual_scroll_to(&mut self, offset: usize) {
        self.scroll_offset = offset.min(self.max_scroll_offset());
        self.auto_scroll.on_manual_scroll(
            self.scroll_offset,
            self.layout.total_extent(),
            self.viewport_height,
        );
        // Scrolling free cancels any follow an earlier append scheduled;
        // in Free mode appends never move the viewport.
        if !self.auto_scroll.is_pinned() {
            self.follow_pending = false;
        }
    }

    /// Scroll up by `rows`.
    pub fn scroll_up(&mut self, rows: usize) {
        self.manual_scroll_to(self.scroll_offset.saturating_sub(rows));
    }

    /// Scroll down by `rows`.
    pub fn scroll_down(&mut self, rows: usize) {
        self.manual_scroll_to(self.scroll_offset.saturating_add(rows));
    }

    /// Page up by one viewport.
    pub fn page_up(&mut self) {
        self.scroll_up(self.viewport_height);
    }

    /// Page down by one viewport.
    pub fn page_down(&mut self) {
        self.scroll_down(self.viewport_height);
    }

    /// Jump to the top (frees auto-scroll unless content fits the viewport).
    pub fn scroll_to_top(&mut self) {
        self.manual_scroll_to(0);
    }

    /// Jump to the bottom (re-pins).
    pub fn scroll_to_bottom(&mut self) {
        self.manual_scroll_to(self.max_scroll_offset());
    }

    /// Toggle follow mode directly, independent of scroll position.
    ///
    /// Forcing pinned schedules an immediate follow; the forced value holds
    /// until the next manual scroll re-evaluates it.
    pub fn toggle_follow(&mut self) {
        match self.auto_scroll.mode() {
            ScrollMode::Pinned => self.auto_scroll.force(ScrollMode::Free),
            ScrollMode::Free => {
                self.auto_scroll.force(ScrollMode::Pinned);
                self.follow_pending = true;
            }
        }
    }

    /// Viewport geometry changed: re-layout and re-clamp.
    pub fn on_resize(&mut self, content_width: usize, viewport_height: usize) {
        self.viewport_height = viewport_height;
        self.layout.set_container_width(content_width, &self.buffer);
        self.scroll_offset = self.scroll_offset.min(self.max_scroll_offset());
        if self.auto_scroll.is_pinned() {
            self.follow_pending = true;
        }
    }

    // ===== Search =====

    /// Current input mode.
    pub fn input_mode(&self) -> &InputMode {
        &self.input_mode
    }

    /// Open the search bar, seeded with the active term.
    pub fn begin_search(&mut self) {
        self.input_mode = InputMode::TypingSearch {
            pending: self.search.term().to_string(),
        };
    }

    /// Append a character to the pending term.
    pub fn push_search_char(&mut self, c: char) {
        if let InputMode::TypingSearch { pending } = &mut self.input_mode {
            pending.push(c);
        }
    }

    /// Delete the last character of the pending term.
    pub fn pop_search_char(&mut self) {
        if let InputMode::TypingSearch { pending } = &mut self.input_mode {
            pending.pop();
        }
    }

    /// Commit the pending term and jump to its first match.
    pub fn commit_search(&mut self) {
        if let InputMode::TypingSearch { pending } = &self.input_mode {
            let term = pending.clone();
            self.search.set_term(term, &self.buffer);
            self.input_mode = InputMode::Browsing;
            if !self.search.term().is_empty() {
                self.next_match();
            }
        }
    }

    /// Close the search bar and clear the active term.
    pub fn cancel_search(&mut self) {
        self.search.set_term("", &self.buffer);
        self.input_mode = InputMode::Browsing;
    }

    /// Advance to the next match and center it.
    pub fn next_match(&mut self) {
        if let Some(line) = self.search.next() {
            self.center_on(line);
        }
    }

    /// Step to the previous match and center it.
    pub fn prev_match(&mut self) {
        if let Some(line) = self.search.prev() {
            self.center_on(line);
        }
    }

    /// Center `line` in the viewport.
    ///
    /// A deterministic function of the target and current layout, so
    /// repeating it for the same target is idempotent. Counts as a manual
    /// scroll: auto-scroll re-evaluates (centering away from the bottom
    /// frees it).
    pub fn center_on(&mut self, line: usize) {
        if line >= self.layout.len() {
            return;
        }
        let row_center = self.layout.offset_of(line) + self.layout.height(line) / 2;
        let target = row_center.saturating_sub(self.viewport_height / 2);
        self.manual_scroll_to(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_lines(lines: usize, viewport: usize) -> AppState {
        let mut state = AppState::new(80, viewport, false);
        state.apply_stream_event(StreamEvent::Opened);
        for i in 0..lines {
            state.append_line(format!("line {i}"));
        }
        state
    }

    #[test]
    fn pinned_appends_schedule_then_resolve_to_bottom() {
        let mut state = state_with_lines(0, 10);
        assert_eq!(state.scroll_mode(), ScrollMode::Pinned);

        for i in 0..30 {
            state.append_line(format!("line {i}"));
            assert!(state.follow_pending(), "append schedules, not performs");
            state.apply_pending_follow();
            assert_eq!(
                state.scroll_offset(),
                state.layout.total_extent().saturating_sub(10),
                "offset tracks the new bottom after each append"
            );
        }
    }

    #[test]
    fn free_appends_leave_offset_unchanged() {
        let mut state = state_with_lines(30, 10);
        state.manual_scroll_to(5);
        assert_eq!(state.scroll_mode(), ScrollMode::Free);

        for i in 0..20 {
            state.append_line(format!("more {i}"));
            state.apply_pending_follow();
            assert_eq!(state.scroll_offset(), 5);
        }
    }

    #[test]
    fn scrolling_to_bottom_repins() {
        let mut state = state_with_lines(30, 10);
        state.manual_scroll_to(0);
        assert_eq!(state.scroll_mode(), ScrollMode::Free);

        state.scroll_to_bottom();
        assert_eq!(state.scroll_mode(), ScrollMode::Pinned);
    }

    #[test]
    fn toggle_follow_holds_until_manual_scroll() {
        let mut state = state_with_lines(30, 10);
        state.manual_scroll_to(0); // free, far from bottom

        state.toggle_follow();
        assert_eq!(state.scroll_mode(), ScrollMode::Pinned);
        assert!(state.follow_pending());

        state.scroll_up(1); // manual scroll re-evaluates
        assert_eq!(state.scroll_mode(), ScrollMode::Free);
    }

    #[test]
    fn stream_events_drive_connection_state() {
        let mut state = AppState::new(80, 10, false);
        assert_eq!(*state.connection(), ConnectionState::Connecting);

        state.apply_stream_event(StreamEvent::Opened);
        assert!(state.connection().is_connected());

        state.apply_stream_event(StreamEvent::Line("hello".to_string()));
        assert_eq!(state.buffer.len(), 1);

        state.apply_stream_event(StreamEvent::Closed {
            clean: false,
            code: 1011,
            reason: "server error".to_string(),
        });
        assert!(state.connection().is_terminal());
        assert_eq!(state.buffer.len(), 1, "buffer stays browsable after close");
    }

    #[test]
    fn search_typing_state_machine() {
        let mut state = state_with_lines(5, 10);
        assert_eq!(*state.input_mode(), InputMode::Browsing);

        state.begin_search();
        state.push_search_char('l');
        state.push_search_char('i');
        state.push_search_char('x');
        state.pop_search_char();
        state.push_search_char('n');
        state.push_search_char('e');
        assert_eq!(
            *state.input_mode(),
            InputMode::TypingSearch {
                pending: "line".to_string()
            }
        );

        state.commit_search();
        assert_eq!(*state.input_mode(), InputMode::Browsing);
        assert_eq!(state.search.term(), "line");
        assert_eq!(state.search.matches().len(), 5);
        assert_eq!(state.search.current(), Some(0), "jumped to first match");
    }

    #[test]
    fn commit_search_centers_first_match_and_frees_scroll() {
        let mut state = state_with_lines(50, 10);
        state.append_line("needle".to_string());
        for i in 0..50 {
            state.append_line(format!("tail {i}"));
        }
        state.apply_pending_follow();

        state.begin_search();
        for c in "needle".chars() {
            state.push_search_char(c);
        }
        state.commit_search();

        // Match is line 50 of 101 single-height rows: centered, not pinned.
        assert_eq!(state.search.current_line(), Some(50));
        assert_eq!(state.scroll_offset(), 45, "row 50 centered in a 10-row viewport");
        assert_eq!(state.scroll_mode(), ScrollMode::Free);
    }

    #[test]
    fn center_on_is_idempotent() {
        let mut state = state_with_lines(100, 10);
        state.center_on(40);
        let first = state.scroll_offset();
        state.center_on(40);
        assert_eq!(state.scroll_offset(), first);
    }

    #[test]
    fn cancel_search_clears_term() {
        let mut state = state_with_lines(5, 10);
        state.begin_search();
        state.push_search_char('z');
        state.commit_search();
        assert_eq!(state.search.matches().len(), 0);

        state.begin_search();
        state.cancel_search();
        assert_eq!(state.search.term(), "");
        assert_eq!(state.search.matches().len(), 5, "empty term matches all");
    }

    #[test]
    fn resize_reclamps_and_schedules_follow_when_pinned() {
        let mut state = state_with_lines(40, 10);
        state.apply_pending_follow();
        assert_eq!(state.scroll_offset(), 30);

        state.on_resize(80, 20);
        assert!(state.follow_pending());
        state.apply_pending_follow();
        assert_eq!(state.scroll_offset(), 20);
    }

    #[test]
    fn reset_stream_keeps_term_and_clears_buffer() {
        let mut state = state_with_lines(10, 10);
        state.begin_search();
        state.push_search_char('l');
        state.commit_search();
        assert!(!state.search.matches().is_empty());

        state.reset_stream(true);
        assert!(state.buffer.is_empty());
        assert_eq!(state.search.term(), "l");
        assert!(state.search.matches().is_empty());
        assert!(state.timestamps());
        assert_eq!(*state.connection(), ConnectionState::Connecting);
        assert_eq!(state.scroll_offset(), 0);
    }
}

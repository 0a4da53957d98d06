//! Auto-scroll state machine.
//!
//! Two states: `Pinned` (the viewport tracks new content at the bottom) and
//! `Free` (appends never move the viewport). Manual scroll events re-evaluate
//! the state from the viewport's distance to the bottom; a user toggle can
//! force either state, and the forced value holds until the next manual
//! scroll re-evaluates it.
//!
//! The follow effect is two-phase: the controller only *decides*; the owner
//! raises a pending-follow flag on append and the renderer performs the
//! actual scroll on the next frame, after layout has settled.

/// Whether the viewport follows appended content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Viewport tracks the bottom; every append schedules a scroll-to-bottom.
    Pinned,
    /// Viewport stays where the user put it.
    Free,
}

/// Rows from the bottom within which a manual scroll re-pins.
///
/// Offsets are whole terminal rows, so "within less than one unit" means
/// exactly at the bottom.
const BOTTOM_EPSILON: usize = 1;

/// Decides whether new lines force the viewport to the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoScrollController {
    mode: ScrollMode,
}

impl Default for AutoScrollController {
    /// A tail client starts pinned: following the stream is its purpose.
    fn default() -> Self {
        Self {
            mode: ScrollMode::Pinned,
        }
    }
}

impl AutoScrollController {
    /// Start in the default `Pinned` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode.
    pub fn mode(&self) -> ScrollMode {
        self.mode
    }

    /// True when appends should schedule a scroll-to-bottom.
    pub fn is_pinned(&self) -> bool {
        self.mode == ScrollMode::Pinned
    }

    /// Re-evaluate after a manual scroll event.
    ///
    /// Pins when the viewport ends within [`BOTTOM_EPSILON`] of the bottom
    /// of the total content; frees otherwise.
    pub fn on_manual_scroll(
        &mut self,
        scroll_offset: usize,
        total_extent: usize,
        viewport_height: usize,
    ) {
        let max_offset = total_extent.saturating_sub(viewport_height);
        self.mode = if max_offset.saturating_sub(scroll_offset) < BOTTOM_EPSILON {
            ScrollMode::Pinned
        } else {
            ScrollMode::Free
        };
    }

    /// Force a mode directly (the user-visible follow toggle), independent
    /// of scroll position. Holds until the next manual scroll.
    pub fn force(&mut self, mode: ScrollMode) {
        self.mode = mode;
    }
}

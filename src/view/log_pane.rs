//! Windowed log pane rendering.
//!
//! The pane is a thin adapter over the pure window computation: it measures
//! the rows the virtualizer materialized (feeding actual wrapped heights
//! back into the layout), recomputes the window with the corrected heights,
//! and draws only the wrapped lines that intersect the viewport.

use crate::state::{AppState, ScrollMode};
use crate::view_state::window::compute_window;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::StatefulWidget,
};
use unicode_width::UnicodeWidthChar;

/// Stateful widget rendering the virtualized line buffer.
pub struct LogPane {
    overscan: usize,
}

impl LogPane {
    /// Pane with the given overscan (extra rows materialized per side).
    pub fn new(overscan: usize) -> Self {
        Self { overscan }
    }
}

impl StatefulWidget for LogPane {
    type State = AppState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let width = area.width as usize;
        let height = area.height as usize;

        if state.layout.params().container_width != width || state.viewport_height() != height {
            state.on_resize(width, height);
        }
        state.apply_pending_follow();

        // Measure pass: the materialized rows get their real wrapped height.
        let window = compute_window(&state.layout, height, state.scroll_offset(), self.overscan);
        let mut wrapped_rows: Vec<(usize, Vec<String>)> = Vec::with_capacity(window.len());
        for item in &window.items {
            let text = state
                .buffer
                .get(item.index)
                .map(|line| line.text().to_string())
                .unwrap_or_default();
            let wrapped = wrap_line(&text, width);
            state.layout.record_measured(item.index, wrapped.len());
            wrapped_rows.push((item.index, wrapped));
        }

        // Offsets may have shifted under the corrections; recompute before
        // drawing so rows land where the layout now says they are.
        let window = compute_window(&state.layout, height, state.scroll_offset(), self.overscan);
        let scroll = state.scroll_offset();

        for item in &window.items {
            let Some((_, wrapped)) = wrapped_rows.iter().find(|(i, _)| *i == item.index) else {
                continue;
            };
            let style = row_style(state, item.index);
            for (line_no, line) in wrapped.iter().enumerate() {
                let y = item.offset + line_no;
                if y < scroll || y >= scroll + height {
                    continue;
                }
                let screen_y = area.y + (y - scroll) as u16;
                buf.set_stringn(area.x, screen_y, line, width, style);
            }
        }

        // Corrections can move the bottom; keep a pinned viewport on it
        // next frame.
        if state.scroll_mode() == ScrollMode::Pinned
            && state.scroll_offset() != state.max_scroll_offset()
        {
            state.schedule_follow();
        }
    }
}

/// Style for a row: plain, match, or the current match.
fn row_style(state: &AppState, index: usize) -> Style {
    if state.search.term().is_empty() {
        return Style::default();
    }
    if state.search.current_line() == Some(index) {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else if state.search.matches().binary_search(&index).is_ok() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

/// Greedy-wrap `text` to `width` display columns.
///
/// Splits on embedded newlines first; every segment yields at least one
/// (possibly empty) output line. A character wider than the remaining space
/// starts a new line; the measure is display columns, the same one height
/// estimation uses.
pub fn wrap_line(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for segment in text.split('\n') {
        let mut current = String::new();
        let mut used = 0usize;
        for c in segment.chars() {
            let w = c.width().unwrap_or(0);
            if used + w > width && !current.is_empty() {
                out.push(std::mem::take(&mut current));
                used = 0;
            }
            current.push(c);
            used += w;
        }
        out.push(current);
    }

    out
}

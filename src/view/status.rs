//! Status bar: connection state, line count, match position, follow mode.

use crate::state::{AppState, ScrollMode};
use crate::stream::ConnectionState;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// One-row status bar widget.
pub struct StatusBar<'a> {
    state: &'a AppState,
}

impl<'a> StatusBar<'a> {
    /// Status bar over the current app state.
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = vec![connection_span(self.state.connection())];

        spans.push(Span::raw(format!("  {} lines", self.state.buffer.len())));

        if !self.state.search.term().is_empty() {
            let total = self.state.search.matches().len();
            let position = match self.state.search.current() {
                Some(i) => format!("{}/{}", i + 1, total),
                None => format!("-/{total}"),
            };
            spans.push(Span::styled(
                format!("  match {position} '{}'", self.state.search.term()),
                Style::default().fg(Color::Yellow),
            ));
        }

        if self.state.scroll_mode() == ScrollMode::Pinned {
            spans.push(Span::styled(
                "  [FOLLOW]",
                Style::default().fg(Color::Green),
            ));
        }

        if self.state.timestamps() {
            spans.push(Span::raw("  [TS]"));
        }

        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
    }
}

/// Colored span for the connection state.
fn connection_span(state: &ConnectionState) -> Span<'static> {
    match state {
        ConnectionState::Connecting => Span::styled(
            " CONNECTING ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        ConnectionState::Connected => Span::styled(
            " LIVE ",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        ConnectionState::Errored { reason } => Span::styled(
            format!(" ERROR: {reason} "),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        ConnectionState::Closed {
            clean,
            code,
            reason,
        } => {
            let text = match (clean, reason.is_empty()) {
                (true, true) => " CLOSED ".to_string(),
                (true, false) => format!(" CLOSED: {reason} "),
                (false, true) => format!(" CLOSED (code {code}) "),
                (false, false) => format!(" CLOSED (code {code}): {reason} "),
            };
            let color = if *clean { Color::Gray } else { Color::Red };
            Span::styled(text, Style::default().fg(color))
        }
    }
}

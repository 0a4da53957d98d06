//! Search input widget.

use crate::state::{AppState, InputMode};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Search bar, rendered while the user is typing a term.
pub struct SearchInput<'a> {
    state: &'a AppState,
}

impl<'a> SearchInput<'a> {
    /// Search bar over the current app state.
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }
}

impl Widget for SearchInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let InputMode::TypingSearch { pending } = self.state.input_mode() else {
            return;
        };

        let spans = vec![
            Span::raw(pending.clone()),
            // Block cursor at the end of the pending term.
            Span::styled(
                " ",
                Style::default()
                    .bg(Color::White)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
        ];

        Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("Search"))
            .render(area, buf);
    }
}

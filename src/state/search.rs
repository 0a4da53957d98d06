//! Live search over the line buffer.
//!
//! Matching is substring and case-insensitive over the full current buffer,
//! never a truncated window. The match set is an ordered subsequence of
//! buffer indices; because the buffer is append-only, a fixed term only ever
//! *extends* the match set, so appends are indexed incrementally while a term
//! change triggers a full recompute.

use crate::model::LineBuffer;

/// Search state: term, ordered matches, and current position.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    term: String,
    term_lower: String,
    /// Buffer indices whose text matches, in buffer order.
    matches: Vec<usize>,
    /// Position within `matches`; `None` until the user navigates.
    current: Option<usize>,
    /// Number of buffer lines already scanned for the current term.
    scanned: usize,
}

impl SearchState {
    /// Empty-term state: every line matches.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current search term.
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Ordered buffer indices of matching lines.
    ///
    /// With an empty term this is every index, in order.
    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    /// Current position within [`matches`](Self::matches), if any.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Buffer index of the current match, if any.
    pub fn current_line(&self) -> Option<usize> {
        self.current.and_then(|i| self.matches.get(i).copied())
    }

    /// Replace the term and recompute matches over the full buffer.
    ///
    /// Resets the current position: navigation starts over for a new term.
    pub fn set_term(&mut self, term: impl Into<String>, buffer: &LineBuffer) {
        self.term = term.into();
        self.term_lower = self.term.to_lowercase();
        self.matches.clear();
        self.current = None;
        self.scanned = 0;
        self.scan_appended(buffer);
    }

    /// Index lines appended to the buffer since the last scan.
    ///
    /// Cheap no-op when nothing was appended; the current position is
    /// preserved (appends never reorder earlier matches).
    pub fn scan_appended(&mut self, buffer: &LineBuffer) {
        for index in self.scanned..buffer.len() {
            if let Some(line) = buffer.get(index) {
                if self.is_match(line.text()) {
                    self.matches.push(index);
                }
            }
        }
        self.scanned = buffer.len();
    }

    /// Advance to the next match, wrapping past the end.
    ///
    /// From an unset position this selects the first match. No-op with zero
    /// matches. Returns the buffer index of the new current match.
    pub fn next(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = Some(match self.current {
            None => 0,
            Some(i) => (i + 1) % self.matches.len(),
        });
        self.current_line()
    }

    /// Step back to the previous match, wrapping past the start.
    ///
    /// From the first match, or an unset position, this selects the last
    /// match. No-op with zero matches. Returns the buffer index of the new
    /// current match.
    pub fn prev(&mut self) -> Option<usize> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = Some(match self.current {
            None | Some(0) => self.matches.len() - 1,
            Some(i) => i - 1,
        });
        self.current_line()
    }

    /// True if `text` matches the current term.
    pub fn is_match(&self, text: &str) -> bool {
        self.term_lower.is_empty() || text.to_lowercase().contains(&self.term_lower)
    }
}

// ===== Tests =====

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;

//! Tests for search filtering and wraparound navigation.

use super::*;

fn buffer_of(lines: &[&str]) -> LineBuffer {
    let mut buffer = LineBuffer::new();
    for line in lines {
        buffer.append((*line).to_string());
    }
    buffer
}

#[test]
fn empty_term_matches_every_line_in_order() {
    let buffer = buffer_of(&["a", "b", "c"]);
    let mut search = SearchState::new();
    search.set_term("", &buffer);

    assert_eq!(search.matches(), &[0, 1, 2]);
}

#[test]
fn matching_is_case_insensitive_and_preserves_order() {
    let buffer = buffer_of(&["ERROR: disk full", "ok", "error code 500"]);
    let mut search = SearchState::new();
    search.set_term("error", &buffer);

    assert_eq!(search.matches(), &[0, 2]);
}

#[test]
fn substring_matches_anywhere_in_line() {
    let buffer = buffer_of(&["prefix needle suffix", "no match here"]);
    let mut search = SearchState::new();
    search.set_term("needle", &buffer);

    assert_eq!(search.matches(), &[0]);
}

#[test]
fn next_from_unset_selects_first_match() {
    let buffer = buffer_of(&["x", "y x", "z"]);
    let mut search = SearchState::new();
    search.set_term("x", &buffer);

    assert_eq!(search.current(), None);
    assert_eq!(search.next(), Some(0));
    assert_eq!(search.current(), Some(0));
}

#[test]
fn next_wraps_from_last_to_first() {
    let buffer = buffer_of(&["x", "y", "x"]);
    let mut search = SearchState::new();
    search.set_term("x", &buffer);

    search.next(); // -> matches[0] (line 0)
    search.next(); // -> matches[1] (line 2)
    assert_eq!(search.current_line(), Some(2));

    assert_eq!(search.next(), Some(0), "wraps to first match");
    assert_eq!(search.current(), Some(0));
}

#[test]
fn prev_from_unset_selects_last_match() {
    let buffer = buffer_of(&["x", "y", "x"]);
    let mut search = SearchState::new();
    search.set_term("x", &buffer);

    assert_eq!(search.prev(), Some(2));
}

#[test]
fn prev_wraps_from_first_to_last() {
    let buffer = buffer_of(&["x", "y", "x"]);
    let mut search = SearchState::new();
    search.set_term("x", &buffer);

    search.next(); // current at first match
    assert_eq!(search.prev(), Some(2), "wraps to last match");
}

#[test]
fn navigation_is_a_noop_with_zero_matches() {
    let buffer = buffer_of(&["a", "b"]);
    let mut search = SearchState::new();
    search.set_term("zzz", &buffer);

    assert_eq!(search.next(), None);
    assert_eq!(search.prev(), None);
    assert_eq!(search.current(), None);
}

#[test]
fn appended_lines_extend_matches_incrementally() {
    let mut buffer = buffer_of(&["error one", "fine"]);
    let mut search = SearchState::new();
    search.set_term("error", &buffer);
    assert_eq!(search.matches(), &[0]);

    buffer.append("another error".to_string());
    buffer.append("still fine".to_string());
    search.scan_appended(&buffer);

    assert_eq!(search.matches(), &[0, 2]);
}

#[test]
fn append_preserves_current_position() {
    let mut buffer = buffer_of(&["error a", "error b"]);
    let mut search = SearchState::new();
    search.set_term("error", &buffer);
    search.next();
    search.next();
    assert_eq!(search.current_line(), Some(1));

    buffer.append("error c".to_string());
    search.scan_appended(&buffer);

    assert_eq!(search.current_line(), Some(1), "position survives appends");
    assert_eq!(search.next(), Some(2), "new match reachable");
}

#[test]
fn term_change_resets_position_and_rescans() {
    let buffer = buffer_of(&["alpha", "beta", "alpha beta"]);
    let mut search = SearchState::new();
    search.set_term("alpha", &buffer);
    search.next();
    assert_eq!(search.current_line(), Some(0));

    search.set_term("beta", &buffer);
    assert_eq!(search.matches(), &[1, 2]);
    assert_eq!(search.current(), None, "position resets on term change");
}

#[test]
fn empty_term_after_append_still_matches_everything() {
    let mut buffer = buffer_of(&["a"]);
    let mut search = SearchState::new();
    search.set_term("", &buffer);
    buffer.append("b".to_string());
    search.scan_appended(&buffer);

    assert_eq!(search.matches(), &[0, 1]);
}

//! Global-search view state for rdir.
//!
//! Tracks the query editor (with a rune-indexed cursor and word motions),
//! the published result list with its precomputed match spans, and the
//! scroll window. The walking itself happens on the search worker; this
//! module only owns what the reducer and renderer need.

use crate::core::worker::SearchResult;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Delay between the last keystroke and the dispatched search.
const SEARCH_DEBOUNCE: Duration = Duration::from_millis(120);

#[derive(Default)]
pub struct GlobalSearchState {
    active: bool,
    query: Vec<char>,
    /// Cursor position in runes, 0..=query.len().
    cursor: usize,
    results: Vec<SearchResult>,
    selected: usize,
    scroll: usize,
    scanned: usize,
    generation: u64,
    debounce_until: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl GlobalSearchState {
    // Getters / accessors

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn query(&self) -> String {
        self.query.iter().collect()
    }

    pub fn query_is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selected_result(&self) -> Option<&SearchResult> {
        self.results.get(self.selected)
    }

    // Lifecycle

    pub fn enter(&mut self) {
        self.active = true;
    }

    /// Leaves search mode, cancelling any in-flight walk.
    pub fn exit(&mut self) {
        self.cancel_inflight();
        self.active = false;
        self.query.clear();
        self.cursor = 0;
        self.results.clear();
        self.selected = 0;
        self.scroll = 0;
        self.debounce_until = None;
    }

    /// Clears the query but stays in search mode.
    pub fn reset_query(&mut self) {
        self.cancel_inflight();
        self.query.clear();
        self.cursor = 0;
        self.results.clear();
        self.selected = 0;
        self.scroll = 0;
        self.debounce_until = None;
    }

    fn cancel_inflight(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.store(true, Ordering::Release);
        }
    }

    /// Prepares a new walk: bumps the generation, installs a fresh cancel
    /// token and returns (generation, token) for the request.
    pub fn prepare_request(&mut self) -> (u64, Arc<AtomicBool>) {
        self.cancel_inflight();
        self.generation = self.generation.wrapping_add(1);
        let token = Arc::new(AtomicBool::new(false));
        self.cancel = Some(Arc::clone(&token));
        self.debounce_until = None;
        (self.generation, token)
    }

    /// Accepts results if they match the newest generation.
    pub fn accept_results(&mut self, generation: u64, results: Vec<SearchResult>, scanned: usize) {
        if generation != self.generation {
            return;
        }
        self.results = results;
        self.scanned = scanned;
        self.selected = 0;
        self.scroll = 0;
    }

    // Debounce

    pub fn mark_dirty(&mut self) {
        self.debounce_until = Some(Instant::now() + SEARCH_DEBOUNCE);
    }

    /// True once the debounce window has elapsed; clears the marker.
    pub fn take_due(&mut self) -> bool {
        match self.debounce_until {
            Some(until) if Instant::now() >= until => {
                self.debounce_until = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.debounce_until.is_some()
    }

    // Query editing

    pub fn insert(&mut self, ch: char) {
        self.query.insert(self.cursor, ch);
        self.cursor += 1;
        self.mark_dirty();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.query.remove(self.cursor);
            self.mark_dirty();
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.query.len() {
            self.query.remove(self.cursor);
            self.mark_dirty();
        }
    }

    /// Deletes the word before the cursor (whitespace-delimited).
    pub fn delete_word(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let mut start = self.cursor;
        while start > 0 && self.query[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.query[start - 1].is_whitespace() {
            start -= 1;
        }
        self.query.drain(start..self.cursor);
        self.cursor = start;
        self.mark_dirty();
    }

    pub fn move_cursor(&mut self, direction: crate::app::actions::CursorMove) {
        use crate::app::actions::CursorMove::*;
        match direction {
            Left => self.cursor = self.cursor.saturating_sub(1),
            Right => self.cursor = (self.cursor + 1).min(self.query.len()),
            Home => self.cursor = 0,
            End => self.cursor = self.query.len(),
            WordLeft => {
                while self.cursor > 0 && self.query[self.cursor - 1].is_whitespace() {
                    self.cursor -= 1;
                }
                while self.cursor > 0 && !self.query[self.cursor - 1].is_whitespace() {
                    self.cursor -= 1;
                }
            }
            WordRight => {
                let len = self.query.len();
                while self.cursor < len && !self.query[self.cursor].is_whitespace() {
                    self.cursor += 1;
                }
                while self.cursor < len && self.query[self.cursor].is_whitespace() {
                    self.cursor += 1;
                }
            }
        }
    }

    // Result navigation

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.results.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_index(&mut self, index: usize) {
        if index < self.results.len() {
            self.selected = index;
        }
    }

    pub fn page(&mut self, down: bool, page: usize) {
        if self.results.is_empty() {
            return;
        }
        let page = page.max(1);
        self.selected = if down {
            (self.selected + page).min(self.results.len() - 1)
        } else {
            self.selected.saturating_sub(page)
        };
    }

    /// Keeps the selected row inside a viewport of `rows` lines.
    pub fn clamp_scroll(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + rows {
            self.scroll = self.selected + 1 - rows;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> GlobalSearchState {
        let mut state = GlobalSearchState::default();
        state.enter();
        for c in s.chars() {
            state.insert(c);
        }
        state
    }

    #[test]
    fn insert_and_cursor_motion() {
        let mut s = typed("abc def");
        assert_eq!(s.query(), "abc def");
        assert_eq!(s.cursor(), 7);

        s.move_cursor(crate::app::actions::CursorMove::WordLeft);
        assert_eq!(s.cursor(), 4);
        s.move_cursor(crate::app::actions::CursorMove::Home);
        assert_eq!(s.cursor(), 0);
        s.move_cursor(crate::app::actions::CursorMove::WordRight);
        assert_eq!(s.cursor(), 4);
    }

    #[test]
    fn delete_word_takes_prev_word() {
        let mut s = typed("abc def");
        s.delete_word();
        assert_eq!(s.query(), "abc ");
        s.delete_word();
        assert_eq!(s.query(), "");
    }

    #[test]
    fn backspace_and_delete_at_cursor() {
        let mut s = typed("ab");
        s.move_cursor(crate::app::actions::CursorMove::Left);
        s.backspace();
        assert_eq!(s.query(), "b");
        assert_eq!(s.cursor(), 0);
        s.delete();
        assert_eq!(s.query(), "");
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut s = typed("x");
        let (generation, _) = s.prepare_request();
        s.accept_results(generation.wrapping_sub(1), vec![], 10);
        assert_eq!(s.scanned(), 0, "stale generation must not publish");
        s.accept_results(generation, vec![], 10);
        assert_eq!(s.scanned(), 10);
    }

    #[test]
    fn scroll_follows_selection() {
        let mut s = GlobalSearchState::default();
        s.results = (0..50)
            .map(|i| crate::core::worker::SearchResult {
                path: std::path::PathBuf::from(format!("f{i}")),
                relative: format!("f{i}"),
                is_dir: false,
                score: 0,
                spans: vec![],
            })
            .collect();
        s.selected = 30;
        s.clamp_scroll(10);
        assert_eq!(s.scroll(), 21);
        s.selected = 5;
        s.clamp_scroll(10);
        assert_eq!(s.scroll(), 5);
    }
}

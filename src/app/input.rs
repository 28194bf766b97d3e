//! Input mapping for rdir.
//!
//! Translates raw crossterm key and mouse events into [Action]s. The table
//! consulted depends on the modal state: help overlay, filter editing,
//! global search, full-screen preview, then normal mode. Input modes accept
//! printable characters (including `q`) into the query; `Esc` backs out one
//! step.

use crate::app::actions::{Action, CursorMove, HistoryDirection, ListDirection};
use crate::app::state::AppState;
use crate::ui::layout;

use crossterm::event::{
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

/// Maps a key event to an action under the current modal state.
pub fn map_key(state: &AppState, key: KeyEvent) -> Option<Action> {
    // Ctrl+C always quits, whatever the mode.
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    if state.help_visible {
        return map_help_key(key);
    }
    if state.search.is_active() {
        return map_search_key(state, key);
    }
    if state.filter_active {
        return map_filter_key(state, key);
    }
    if state.preview_full_screen {
        return map_preview_key(key);
    }
    map_normal_key(state, key)
}

fn map_help_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc => Some(Action::HelpHide),
        _ => None,
    }
}

fn map_filter_key(state: &AppState, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::FilterClear),
        KeyCode::Esc => {
            if state.filter_query.is_empty() {
                Some(Action::FilterClear)
            } else {
                Some(Action::FilterResetQuery)
            }
        }
        KeyCode::Backspace => Some(Action::FilterBackspace),
        KeyCode::Up => Some(Action::NavigateUp),
        KeyCode::Down => Some(Action::NavigateDown),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::FilterChar { ch })
        }
        _ => None,
    }
}

fn map_search_key(state: &AppState, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Some(Action::GlobalSearchOpen),
        KeyCode::Esc => {
            if state.search.query_is_empty() {
                Some(Action::GlobalSearchClear)
            } else {
                Some(Action::GlobalSearchResetQuery)
            }
        }
        KeyCode::Backspace => Some(Action::GlobalSearchBackspace),
        KeyCode::Delete => Some(Action::GlobalSearchDelete),
        KeyCode::Up => Some(Action::GlobalSearchNavigate {
            direction: ListDirection::Up,
        }),
        KeyCode::Down => Some(Action::GlobalSearchNavigate {
            direction: ListDirection::Down,
        }),
        KeyCode::PageUp => Some(Action::GlobalSearchPageUp),
        KeyCode::PageDown => Some(Action::GlobalSearchPageDown),
        KeyCode::Left if ctrl => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::WordLeft,
        }),
        KeyCode::Right if ctrl => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::WordRight,
        }),
        KeyCode::Left => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::Left,
        }),
        KeyCode::Right => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::Right,
        }),
        KeyCode::Home => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::Home,
        }),
        KeyCode::End => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::End,
        }),
        KeyCode::Char('a') if ctrl => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::Home,
        }),
        KeyCode::Char('e') if ctrl => Some(Action::GlobalSearchMoveCursor {
            direction: CursorMove::End,
        }),
        KeyCode::Char('w') if ctrl => Some(Action::GlobalSearchDeleteWord),
        KeyCode::Char(ch) if !ctrl => Some(Action::GlobalSearchChar { ch }),
        _ => None,
    }
}

fn map_preview_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Action::PreviewScrollUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::PreviewScrollDown),
        KeyCode::PageUp | KeyCode::Char('b') => Some(Action::PreviewScrollPageUp),
        KeyCode::PageDown | KeyCode::Char(' ') => Some(Action::PreviewScrollPageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::PreviewScrollToStart),
        KeyCode::End | KeyCode::Char('G') => Some(Action::PreviewScrollToEnd),
        KeyCode::Char('w') => Some(Action::TogglePreviewWrap),
        KeyCode::Char('e') => Some(Action::OpenEditor),
        KeyCode::Char('p') => Some(Action::OpenPager),
        KeyCode::Char('?') => Some(Action::HelpShow),
        KeyCode::Left | KeyCode::Esc | KeyCode::Char('q') => Some(Action::PreviewExitFullScreen),
        _ => None,
    }
}

fn map_normal_key(state: &AppState, key: KeyEvent) -> Option<Action> {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Up if shift => Some(Action::PreviewScrollUp),
        KeyCode::Down if shift => Some(Action::PreviewScrollDown),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::NavigateUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::NavigateDown),
        KeyCode::PageUp => Some(Action::ScrollPageUp),
        KeyCode::PageDown => Some(Action::ScrollPageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Action::ScrollToStart),
        KeyCode::End | KeyCode::Char('G') => Some(Action::ScrollToEnd),
        KeyCode::Left if alt => Some(Action::GoToHistory {
            direction: HistoryDirection::Back,
        }),
        KeyCode::Right if alt => Some(Action::GoToHistory {
            direction: HistoryDirection::Forward,
        }),
        KeyCode::Char('[') => Some(Action::GoToHistory {
            direction: HistoryDirection::Back,
        }),
        KeyCode::Char(']') => Some(Action::GoToHistory {
            direction: HistoryDirection::Forward,
        }),
        KeyCode::Enter | KeyCode::Char('l') => match state.selected_entry() {
            Some(entry) if entry.is_dir() => Some(Action::EnterDirectory),
            Some(_) => Some(Action::OpenPager),
            None => None,
        },
        KeyCode::Right => Some(Action::RightArrow),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Backspace => Some(Action::GoUp),
        KeyCode::Char('~') => Some(Action::GoHome),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::RefreshDirectory),
        KeyCode::Char('/') | KeyCode::Char('f') => Some(Action::FilterStart),
        KeyCode::Char('s') => Some(Action::GlobalSearchStart),
        KeyCode::Char('.') => Some(Action::ToggleHiddenFiles),
        KeyCode::Char('y') => Some(Action::YankPath),
        KeyCode::Char('e') => Some(Action::OpenEditor),
        KeyCode::Char('p') => Some(Action::OpenPager),
        KeyCode::Char('w') => Some(Action::TogglePreviewWrap),
        KeyCode::Char('?') => Some(Action::HelpToggle),
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('Q') => Some(Action::QuitAndChange),
        KeyCode::Esc => {
            if !state.filter_query.is_empty() {
                Some(Action::FilterResetQuery)
            } else {
                Some(Action::Quit)
            }
        }
        _ => None,
    }
}

/// Maps a mouse event against the current layout: wheel scrolls the list
/// (or the preview when the pointer is over it), a left click selects.
pub fn map_mouse(state: &AppState, mouse: MouseEvent) -> Option<Action> {
    let metrics = layout::compute(state);
    let over_preview =
        metrics.show_preview && (mouse.column as usize) >= metrics.preview_start;

    match mouse.kind {
        MouseEventKind::ScrollUp => {
            if over_preview {
                Some(Action::PreviewScrollUp)
            } else if state.search.is_active() {
                Some(Action::GlobalSearchNavigate {
                    direction: ListDirection::Up,
                })
            } else {
                Some(Action::NavigateUp)
            }
        }
        MouseEventKind::ScrollDown => {
            if over_preview {
                Some(Action::PreviewScrollDown)
            } else if state.search.is_active() {
                Some(Action::GlobalSearchNavigate {
                    direction: ListDirection::Down,
                })
            } else {
                Some(Action::NavigateDown)
            }
        }
        MouseEventKind::Down(MouseButton::Left) => {
            // Header is row 0, the list starts below it; the two status
            // rows at the bottom are dead.
            let row = mouse.row as usize;
            let list_rows = state.list_viewport_rows();
            if row == 0 || row > list_rows {
                return None;
            }
            let col = mouse.column as usize;
            let in_main = col >= metrics.main_panel_start
                && col < metrics.main_panel_start + metrics.main_panel_width;
            if !in_main {
                return None;
            }
            if state.search.is_active() {
                // Row 1 is the query editor; results start at row 2.
                let index = state.search.scroll() + row.checked_sub(2)?;
                Some(Action::GlobalSearchSelectIndex { index })
            } else {
                let display_index = state.scroll_offset + row - 1;
                Some(Action::MouseSelect { display_index })
            }
        }
        _ => None,
    }
}

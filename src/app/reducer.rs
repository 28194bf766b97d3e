//! The reducer: one dispatch function applying every [Action] to
//! [AppState].
//!
//! Mutation happens only here (plus the pager's documented subset). The
//! return value is `(mutation_occurred, optional_error)`; errors are also
//! stored on the state so the status line can flash them.

use crate::app::actions::{Action, HistoryDirection, ListDirection};
use crate::app::state::{AppState, ExitMode, ExternalRequest};
use crate::core::external::copy_lines;

use std::path::PathBuf;
use std::time::Instant;

/// Applies `action` to `state`.
pub fn reduce(state: &mut AppState, action: Action) -> (bool, Option<String>) {
    tracing::debug!(?action, "reduce");
    match action {
        // Navigation
        Action::NavigateUp => {
            let changed = state.move_selection(-1);
            selection_moved(state, changed)
        }
        Action::NavigateDown => {
            let changed = state.move_selection(1);
            selection_moved(state, changed)
        }
        Action::ScrollPageUp => {
            let rows = state.list_viewport_rows() as isize;
            let changed = state.move_selection(-rows);
            selection_moved(state, changed)
        }
        Action::ScrollPageDown => {
            let rows = state.list_viewport_rows() as isize;
            let changed = state.move_selection(rows);
            selection_moved(state, changed)
        }
        Action::ScrollToStart => {
            let changed = state.select_display(0);
            selection_moved(state, changed)
        }
        Action::ScrollToEnd => {
            let len = state.display_len();
            let changed = len > 0 && state.select_display(len - 1);
            selection_moved(state, changed)
        }
        Action::EnterDirectory => enter_selected(state),
        Action::GoUp => go_up(state),
        Action::GoHome => match dirs::home_dir() {
            Some(home) => {
                state.navigate_to(home, true);
                (true, None)
            }
            None => fail(state, "no home directory"),
        },
        Action::GoToPath { path } => go_to_path(state, path),
        Action::GoToHistory { direction } => go_to_history(state, direction),
        Action::RefreshDirectory => {
            state.pending_focus = state.selected_entry().map(|e| e.name().clone());
            state.request_directory_load();
            (true, None)
        }
        Action::RightArrow => match state.selected_entry() {
            Some(entry) if entry.is_dir() => enter_selected(state),
            Some(_) => reduce(state, Action::PreviewEnterFullScreen),
            None => (false, None),
        },
        Action::Resize { width, height } => {
            state.screen_width = width;
            state.screen_height = height;
            state.ensure_selection_visible();
            clamp_preview_scroll(state);
            (true, None)
        }

        // Filter
        Action::FilterStart => {
            state.filter_active = true;
            (true, None)
        }
        Action::FilterChar { ch } => {
            state.filter_query.push(ch);
            refilter(state)
        }
        Action::FilterBackspace => {
            if state.filter_query.pop().is_none() {
                return (false, None);
            }
            refilter(state)
        }
        Action::FilterResetQuery => {
            if state.filter_query.is_empty() {
                return (false, None);
            }
            state.filter_query.clear();
            refilter(state)
        }
        Action::FilterClear => {
            // Leaves filter-input mode; a committed query keeps filtering
            // until FilterResetQuery clears it.
            state.filter_active = false;
            refilter(state)
        }

        // Global search
        Action::GlobalSearchStart => {
            state.search.enter();
            (true, None)
        }
        Action::GlobalSearchChar { ch } => {
            state.search.insert(ch);
            (true, None)
        }
        Action::GlobalSearchBackspace => {
            state.search.backspace();
            (true, None)
        }
        Action::GlobalSearchDelete => {
            state.search.delete();
            (true, None)
        }
        Action::GlobalSearchDeleteWord => {
            state.search.delete_word();
            (true, None)
        }
        Action::GlobalSearchMoveCursor { direction } => {
            state.search.move_cursor(direction);
            (true, None)
        }
        Action::GlobalSearchNavigate { direction } => {
            match direction {
                ListDirection::Up => state.search.select_prev(),
                ListDirection::Down => state.search.select_next(),
            }
            let rows = state.list_viewport_rows();
            state.search.clamp_scroll(rows);
            (true, None)
        }
        Action::GlobalSearchPageUp => {
            let rows = state.list_viewport_rows();
            state.search.page(false, rows);
            state.search.clamp_scroll(rows);
            (true, None)
        }
        Action::GlobalSearchPageDown => {
            let rows = state.list_viewport_rows();
            state.search.page(true, rows);
            state.search.clamp_scroll(rows);
            (true, None)
        }
        Action::GlobalSearchResetQuery => {
            state.search.reset_query();
            (true, None)
        }
        Action::GlobalSearchClear => {
            state.search.exit();
            (true, None)
        }
        Action::GlobalSearchOpen => open_search_hit(state),
        Action::GlobalSearchSelectIndex { index } => {
            state.search.select_index(index);
            (true, None)
        }

        // Preview
        Action::PreviewEnterFullScreen => {
            if state.preview_data.is_none() && !state.preview_loading {
                state.generate_preview();
            }
            state.preview_full_screen = true;
            (true, None)
        }
        Action::PreviewExitFullScreen => {
            if !state.preview_full_screen {
                return (false, None);
            }
            state.preview_full_screen = false;
            (true, None)
        }
        Action::PreviewScrollUp => preview_scroll(state, -1),
        Action::PreviewScrollDown => preview_scroll(state, 1),
        Action::PreviewScrollPageUp => {
            preview_scroll(state, -(preview_viewport_rows(state) as isize))
        }
        Action::PreviewScrollPageDown => {
            preview_scroll(state, preview_viewport_rows(state) as isize)
        }
        Action::PreviewScrollToStart => {
            state.preview_scroll_offset = 0;
            state.preview_wrap_offset = 0;
            (true, None)
        }
        Action::PreviewScrollToEnd => {
            let total = preview_total_lines(state);
            state.preview_scroll_offset =
                total.saturating_sub(preview_viewport_rows(state));
            state.preview_wrap_offset = 0;
            (true, None)
        }
        Action::TogglePreviewWrap => {
            state.preview_wrap = !state.preview_wrap;
            state.preview_wrap_offset = 0;
            (true, None)
        }

        // External
        Action::YankPath => yank_path(state),
        Action::OpenEditor => {
            if !state.editor_available() {
                return fail(state, "no editor configured");
            }
            match state.selected_entry() {
                Some(entry) if !entry.is_dir() => {
                    state.external_request = Some(ExternalRequest::Editor);
                    (true, None)
                }
                _ => (false, None),
            }
        }
        Action::OpenPager => {
            if state.selected_entry().is_none() {
                return (false, None);
            }
            state.external_request = Some(ExternalRequest::Pager);
            (true, None)
        }

        // Lifecycle
        Action::Quit => {
            state.exit = Some(ExitMode::Quit);
            (true, None)
        }
        Action::QuitAndChange => {
            state.exit = Some(ExitMode::QuitAndChange);
            (true, None)
        }
        Action::ToggleHiddenFiles => {
            state.hide_hidden_files = !state.hide_hidden_files;
            refilter(state)
        }
        Action::HelpToggle => {
            state.help_visible = !state.help_visible;
            (true, None)
        }
        Action::HelpShow => {
            state.help_visible = true;
            (true, None)
        }
        Action::HelpHide => {
            if !state.help_visible {
                return (false, None);
            }
            state.help_visible = false;
            (true, None)
        }
        Action::MouseSelect { display_index } => {
            let changed = state.select_display(display_index);
            selection_moved(state, changed)
        }

        // Async results
        Action::DirectoryLoaded {
            path,
            generation,
            result,
        } => directory_loaded(state, path, generation, result),
        Action::PreviewReady { generation, result } => preview_ready(state, generation, result),
        Action::GlobalSearchResults {
            generation,
            results,
            scanned,
        } => {
            state.search.accept_results(generation, results, scanned);
            (true, None)
        }
    }
}

// Helpers

fn fail(state: &mut AppState, message: impl Into<String>) -> (bool, Option<String>) {
    let message = message.into();
    state.set_error(message.clone());
    (true, Some(message))
}

/// Selection changed ⇒ the preview must follow (debounced).
fn selection_moved(state: &mut AppState, changed: bool) -> (bool, Option<String>) {
    if changed {
        state.schedule_preview();
    }
    (changed, None)
}

fn refilter(state: &mut AppState) -> (bool, Option<String>) {
    let before = state.selected_index;
    state.remap_selection();
    if state.selected_index != before || state.preview_data.is_none() {
        state.schedule_preview();
    }
    (true, None)
}

fn enter_selected(state: &mut AppState) -> (bool, Option<String>) {
    let Some(entry) = state.selected_entry() else {
        return (false, None);
    };
    if !entry.is_dir() {
        return (false, None);
    }
    let target = entry.path().to_path_buf();
    state.navigate_to(target, true);
    (true, None)
}

fn go_up(state: &mut AppState) -> (bool, Option<String>) {
    let Some(parent) = state.current_path.parent().map(PathBuf::from) else {
        return (false, None);
    };
    state.pending_focus = state.current_path.file_name().map(|n| n.to_os_string());
    state.navigate_to(parent, true);
    (true, None)
}

fn go_to_path(state: &mut AppState, path: PathBuf) -> (bool, Option<String>) {
    if path.is_dir() {
        state.navigate_to(path, true);
        return (true, None);
    }
    let Some(parent) = path.parent().map(PathBuf::from) else {
        return fail(state, format!("{}: not a directory", path.display()));
    };
    state.pending_focus = path.file_name().map(|n| n.to_os_string());
    state.navigate_to(parent, true);
    (true, None)
}

fn go_to_history(state: &mut AppState, direction: HistoryDirection) -> (bool, Option<String>) {
    let target = match direction {
        HistoryDirection::Back => state.history_index.checked_sub(1),
        HistoryDirection::Forward => {
            let next = state.history_index + 1;
            (next < state.history.len()).then_some(next)
        }
    };
    let Some(index) = target else {
        return (false, None);
    };
    state.history_index = index;
    let path = state.history[index].clone();
    state.navigate_to(path, false);
    (true, None)
}

fn open_search_hit(state: &mut AppState) -> (bool, Option<String>) {
    let Some(hit) = state.search.selected_result() else {
        return (false, None);
    };
    let path = hit.path.clone();
    let is_dir = hit.is_dir;
    state.search.exit();

    if is_dir {
        state.navigate_to(path, true);
    } else {
        let Some(parent) = path.parent().map(PathBuf::from) else {
            return (false, None);
        };
        state.pending_focus = path.file_name().map(|n| n.to_os_string());
        state.navigate_to(parent, true);
    }
    (true, None)
}

fn yank_path(state: &mut AppState) -> (bool, Option<String>) {
    let Some(entry) = state.selected_entry() else {
        return (false, None);
    };
    let Some(clip) = state.tools.clipboard.clone() else {
        return fail(state, "no clipboard tool available");
    };
    let path_str = entry.path().display().to_string();
    match copy_lines(&clip, std::iter::once(path_str)) {
        Ok(()) => {
            state.last_yank_time = Some(Instant::now());
            (true, None)
        }
        Err(e) => fail(state, e.status_line()),
    }
}

/// Rows the inline/full-screen preview can draw.
fn preview_viewport_rows(state: &AppState) -> usize {
    (state.screen_height as usize).saturating_sub(3).max(1)
}

/// Total source rows of the current preview content, respecting the
/// raw/formatted toggle.
fn preview_total_lines(state: &AppState) -> usize {
    let Some(data) = &state.preview_data else {
        return 0;
    };
    if data.is_dir {
        data.dir_entries.len()
    } else if let Some(info) = &data.binary_info {
        (info.total_bytes as usize).div_ceil(crate::core::preview::HEX_BYTES_PER_LINE)
            .max(info.lines.len())
    } else if data.has_formatted() && !state.preview_prefer_raw {
        data.formatted_segments.len()
    } else {
        data.text_lines.len()
    }
}

fn preview_scroll(state: &mut AppState, delta: isize) -> (bool, Option<String>) {
    let total = preview_total_lines(state);
    if total == 0 {
        return (false, None);
    }
    let max_start = total.saturating_sub(preview_viewport_rows(state));
    let current = state.preview_scroll_offset;
    let next = if delta.is_negative() {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        (current + delta as usize).min(max_start)
    };
    if next == current {
        return (false, None);
    }
    state.preview_scroll_offset = next;
    state.preview_wrap_offset = 0;
    (true, None)
}

fn clamp_preview_scroll(state: &mut AppState) {
    let total = preview_total_lines(state);
    let max_start = total.saturating_sub(preview_viewport_rows(state));
    if state.preview_scroll_offset > max_start {
        state.preview_scroll_offset = max_start;
        state.preview_wrap_offset = 0;
    }
}

fn directory_loaded(
    state: &mut AppState,
    path: PathBuf,
    generation: u64,
    result: Result<(Vec<crate::core::fsx::FileEntry>, Vec<crate::core::fsx::FileEntry>), String>,
) -> (bool, Option<String>) {
    // Stale: a newer request exists or the user navigated away.
    if generation != state.dir_generation || path != state.current_path {
        return (false, None);
    }
    state.dir_loading = false;

    match result {
        Ok((entries, parent_entries)) => {
            state.files = entries;
            state.parent_entries = parent_entries;

            if let Some(focus) = state.pending_focus.take() {
                if let Some(actual) = state.files.iter().position(|e| e.name() == &focus) {
                    state.selected_index = actual;
                } else {
                    state.restore_position();
                }
            } else {
                state.restore_position();
            }
            state.remap_selection();
            state.schedule_preview();
            (true, None)
        }
        Err(message) => {
            state.files.clear();
            state.parent_entries.clear();
            state.remap_selection();
            state.clear_preview();
            fail(state, message)
        }
    }
}

fn preview_ready(
    state: &mut AppState,
    generation: u64,
    result: Result<Box<crate::core::preview::PreviewData>, String>,
) -> (bool, Option<String>) {
    if generation != state.preview_generation {
        return (false, None);
    }
    state.preview_loading = false;
    state.preview_loading_started_at = None;

    match result {
        Ok(data) => {
            state.preview_data = Some(*data);
            clamp_preview_scroll(state);
            (true, None)
        }
        Err(message) => {
            state.preview_data = None;
            fail(state, message)
        }
    }
}

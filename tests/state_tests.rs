//! Tests for AppState navigation, filtering, history and the reducer's
//! selection invariants.
//!
//! Each test builds a sandbox directory, spins up the real loaders and
//! pumps the action channel the way the main loop does. Sandboxes are
//! cleaned up automatically when the tempdir drops.

use rdir_tui::app::actions::{Action, HistoryDirection};
use rdir_tui::app::reducer::reduce;
use rdir_tui::app::state::AppState;
use rdir_tui::config::{Config, RawConfig};
use rdir_tui::core::external::ExternalTools;
use rdir_tui::core::worker::{Loaders, action_channel};

use crossbeam_channel::Receiver;
use rand::Rng;
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn app_for(path: &Path) -> (AppState, Receiver<Action>) {
    let config = Config::from_raw(RawConfig::default());
    let (sink, rx) = action_channel();
    let loaders = Loaders::spawn(sink.clone());
    let state = AppState::new(
        config,
        path.to_path_buf(),
        loaders,
        sink,
        ExternalTools::default(),
    );
    (state, rx)
}

/// Pumps worker results and ticks until `done` holds or the deadline hits.
fn pump_until<F>(state: &mut AppState, rx: &Receiver<Action>, mut done: F) -> bool
where
    F: FnMut(&AppState) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        state.tick();
        while let Ok(action) = rx.try_recv() {
            reduce(state, action);
        }
        if done(state) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn initial_load_orders_dirs_first() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "hello world")?;
    fs::create_dir(dir.path().join("sub"))?;

    let (mut state, rx) = app_for(dir.path());
    assert!(
        pump_until(&mut state, &rx, |s| !s.files.is_empty()),
        "directory never loaded"
    );

    assert_eq!(state.files.len(), 2);
    assert!(state.files[0].is_dir(), "sub/ must sort first");
    assert_eq!(state.files[0].name_str(), "sub");
    assert_eq!(state.files[1].name_str(), "a.txt");
    assert_eq!(state.selected_index, 0);
    Ok(())
}

#[test]
fn navigate_down_loads_text_preview() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "hello world")?;
    fs::create_dir(dir.path().join("sub"))?;

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| !s.files.is_empty());

    let (changed, _) = reduce(&mut state, Action::NavigateDown);
    assert!(changed);
    assert_eq!(state.selected_index, 1);

    assert!(
        pump_until(&mut state, &rx, |s| {
            s.preview_data
                .as_ref()
                .map(|d| !d.text_lines.is_empty())
                .unwrap_or(false)
        }),
        "preview never arrived"
    );

    let preview = state.preview_data.as_ref().expect("preview");
    assert_eq!(preview.text_lines, vec!["hello world".to_string()]);
    assert_eq!(preview.text_char_count, 11);
    assert!(!preview.truncated);
    Ok(())
}

#[test]
fn filter_remaps_selection_to_surviving_entry() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    for name in ["alpha.txt", "echo.txt", "gamma.txt"] {
        File::create(dir.path().join(name))?;
    }

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| s.files.len() == 3);

    reduce(&mut state, Action::ScrollToEnd);
    assert_eq!(state.selected_index, 2, "gamma selected");

    reduce(&mut state, Action::FilterStart);
    reduce(&mut state, Action::FilterChar { ch: 'a' });

    let shown: Vec<&str> = state.display_files().iter().map(|e| e.name_str()).collect();
    assert_eq!(shown, vec!["alpha.txt", "gamma.txt"]);
    // gamma survives the filter, so the selection sticks with it
    assert_eq!(state.selected_index, 2);
    assert_eq!(state.selected_display_index(), Some(1));
    Ok(())
}

#[test]
fn filter_moves_selection_off_hidden_entry() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    for name in ["alpha.txt", "echo.txt", "gamma.txt"] {
        File::create(dir.path().join(name))?;
    }

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| s.files.len() == 3);

    reduce(&mut state, Action::NavigateDown);
    assert_eq!(state.selected_index, 1, "echo selected");

    reduce(&mut state, Action::FilterStart);
    reduce(&mut state, Action::FilterChar { ch: 'a' });

    // echo is filtered out; the nearest surviving entry wins
    let entry = state.selected_entry().expect("selection must survive");
    assert_eq!(entry.name_str(), "gamma.txt");
    Ok(())
}

#[test]
fn hidden_files_respect_toggle() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    File::create(dir.path().join(".hidden"))?;
    File::create(dir.path().join("shown.txt"))?;

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| s.files.len() == 2);

    assert_eq!(state.display_len(), 1, "hidden files start hidden");
    reduce(&mut state, Action::ToggleHiddenFiles);
    assert_eq!(state.display_len(), 2);
    reduce(&mut state, Action::ToggleHiddenFiles);
    assert_eq!(state.display_len(), 1);
    Ok(())
}

#[test]
fn enter_and_go_up_restore_focus() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("nested"))?;
    fs::write(dir.path().join("nested/inner.txt"), "x")?;
    fs::write(dir.path().join("aaa.txt"), "x")?;

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| s.files.len() == 2);

    // "nested" sorts first; enter it
    reduce(&mut state, Action::EnterDirectory);
    assert!(
        pump_until(&mut state, &rx, |s| {
            s.files.len() == 1 && s.files[0].name_str() == "inner.txt"
        }),
        "child directory never loaded"
    );

    reduce(&mut state, Action::GoUp);
    assert!(
        pump_until(&mut state, &rx, |s| s.files.len() == 2),
        "parent never reloaded"
    );
    // the exited directory is focused again
    let entry = state.selected_entry().expect("selection");
    assert_eq!(entry.name_str(), "nested");
    Ok(())
}

#[test]
fn history_walks_back_and_forward() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("one"))?;

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| !s.files.is_empty());
    let root = state.current_path.clone();

    reduce(&mut state, Action::EnterDirectory);
    pump_until(&mut state, &rx, |s| s.current_path != root || !s.dir_loading);
    let child = state.current_path.clone();
    assert_ne!(child, root);

    reduce(
        &mut state,
        Action::GoToHistory {
            direction: HistoryDirection::Back,
        },
    );
    assert_eq!(state.current_path, root);

    reduce(
        &mut state,
        Action::GoToHistory {
            direction: HistoryDirection::Forward,
        },
    );
    assert_eq!(state.current_path, child);

    // walking past either end is a no-op
    reduce(
        &mut state,
        Action::GoToHistory {
            direction: HistoryDirection::Forward,
        },
    );
    assert_eq!(state.current_path, child);
    Ok(())
}

#[test]
fn selection_invariant_survives_random_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let file_count = 12;
    for i in 0..file_count {
        File::create(dir.path().join(format!("file_{i:02}.txt")))?;
    }

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| s.files.len() == file_count);

    let mut rng = rand::rng();
    for _ in 0..2000 {
        let action = match rng.random_range(0..8) {
            0 => Action::NavigateUp,
            1 => Action::NavigateDown,
            2 => Action::ScrollPageUp,
            3 => Action::ScrollPageDown,
            4 => Action::ScrollToStart,
            5 => Action::ScrollToEnd,
            6 => Action::FilterChar { ch: '1' },
            _ => Action::FilterResetQuery,
        };
        reduce(&mut state, action);

        if !state.files.is_empty() {
            assert!(
                state.selected_index < state.files.len(),
                "selection out of bounds"
            );
        } else {
            assert_eq!(state.selected_index, 0);
        }
        if state.display_len() > 0 {
            let display = state
                .selected_display_index()
                .expect("selection must be displayed when anything is");
            assert!(display < state.display_len());
        }
    }
    Ok(())
}

#[test]
fn stale_directory_results_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("a"))?;
    fs::write(dir.path().join("a/inside.txt"), "x")?;

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| !s.files.is_empty());

    // Craft a stale result: an old generation must be ignored even if the
    // path matches.
    let stale = Action::DirectoryLoaded {
        path: state.current_path.clone(),
        generation: state.dir_generation.wrapping_sub(1),
        result: Ok((Vec::new(), Vec::new())),
    };
    let before = state.files.len();
    reduce(&mut state, stale);
    assert_eq!(state.files.len(), before, "stale result must be dropped");
    Ok(())
}

#[test]
fn resize_keeps_selection_visible() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    for i in 0..50 {
        File::create(dir.path().join(format!("f{i:02}")))?;
    }

    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| s.files.len() == 50);

    reduce(&mut state, Action::ScrollToEnd);
    reduce(
        &mut state,
        Action::Resize {
            width: 80,
            height: 10,
        },
    );
    let display = state.selected_display_index().expect("visible selection");
    assert!(display >= state.scroll_offset);
    assert!(display < state.scroll_offset + state.list_viewport_rows());
    Ok(())
}

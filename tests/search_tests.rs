//! Tests for the recursive search worker and the global-search flow
//! through the reducer.

use rdir_tui::app::actions::Action;
use rdir_tui::app::reducer::reduce;
use rdir_tui::app::state::AppState;
use rdir_tui::config::{Config, RawConfig};
use rdir_tui::core::external::ExternalTools;
use rdir_tui::core::worker::{Loaders, SearchRequest, action_channel};

use crossbeam_channel::Receiver;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn sandbox() -> tempfile::TempDir {
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("src/deep")).expect("mkdir");
    fs::write(dir.path().join("src/main.rs"), "fn main() {}").expect("write");
    fs::write(dir.path().join("src/deep/helper.rs"), "x").expect("write");
    fs::write(dir.path().join("readme.md"), "x").expect("write");
    dir
}

#[test]
fn worker_finds_nested_files_with_spans() {
    let dir = sandbox();
    let (sink, rx) = action_channel();
    let loaders = Loaders::spawn(sink);

    loaders.request_search(SearchRequest {
        base_dir: dir.path().to_path_buf(),
        query: "helper".to_string(),
        generation: 7,
        max_results: 100,
        cancel: Arc::new(AtomicBool::new(false)),
    });

    let action = rx
        .recv_timeout(Duration::from_secs(3))
        .expect("search result");
    let Action::GlobalSearchResults {
        generation,
        results,
        scanned,
    } = action
    else {
        panic!("unexpected action");
    };

    assert_eq!(generation, 7);
    assert!(scanned >= 4, "walker saw the tree (scanned {scanned})");
    let hit = results
        .iter()
        .find(|r| r.relative.ends_with("helper.rs"))
        .expect("helper.rs found");
    assert!(!hit.spans.is_empty(), "spans are precomputed by the worker");
    for &(start, end) in &hit.spans {
        assert!(start < end && end <= hit.relative.len());
        assert!(hit.relative.is_char_boundary(start));
        assert!(hit.relative.is_char_boundary(end));
    }
}

#[test]
fn cancelled_search_stays_silent() {
    let dir = sandbox();
    let (sink, rx) = action_channel();
    let loaders = Loaders::spawn(sink);

    let cancel = Arc::new(AtomicBool::new(true));
    loaders.request_search(SearchRequest {
        base_dir: dir.path().to_path_buf(),
        query: "main".to_string(),
        generation: 1,
        max_results: 100,
        cancel,
    });

    assert!(
        rx.recv_timeout(Duration::from_millis(500)).is_err(),
        "cancelled request must not publish"
    );
}

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
fn typed_query_debounces_then_publishes_results() {
    let dir = sandbox();
    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| !s.files.is_empty());

    reduce(&mut state, Action::GlobalSearchStart);
    for ch in "main".chars() {
        reduce(&mut state, Action::GlobalSearchChar { ch });
    }
    assert!(state.search.is_active());

    assert!(
        pump_until(&mut state, &rx, |s| !s.search.results().is_empty()),
        "results never arrived"
    );
    assert!(
        state
            .search
            .results()
            .iter()
            .any(|r| r.relative.ends_with("main.rs"))
    );
}

#[test]
fn opening_a_hit_navigates_to_its_parent() {
    let dir = sandbox();
    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| !s.files.is_empty());

    reduce(&mut state, Action::GlobalSearchStart);
    for ch in "helper".chars() {
        reduce(&mut state, Action::GlobalSearchChar { ch });
    }
    pump_until(&mut state, &rx, |s| !s.search.results().is_empty());

    reduce(&mut state, Action::GlobalSearchOpen);
    assert!(!state.search.is_active(), "open leaves search mode");
    assert!(
        pump_until(&mut state, &rx, |s| {
            s.selected_entry()
                .map(|e| e.name_str() == "helper.rs")
                .unwrap_or(false)
        }),
        "hit's file never focused"
    );
    assert!(state.current_path.ends_with("src/deep"));
}

#[test]
fn query_editing_resets_are_clean() {
    let dir = sandbox();
    let (mut state, rx) = app_for(dir.path());
    pump_until(&mut state, &rx, |s| !s.files.is_empty());

    reduce(&mut state, Action::GlobalSearchStart);
    for ch in "abc".chars() {
        reduce(&mut state, Action::GlobalSearchChar { ch });
    }
    reduce(&mut state, Action::GlobalSearchResetQuery);
    assert!(state.search.query_is_empty());
    assert!(state.search.is_active(), "reset keeps the mode");

    reduce(&mut state, Action::GlobalSearchClear);
    assert!(!state.search.is_active());
}

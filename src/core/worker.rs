//! Background loaders for rdir.
//!
//! Three serial workers (directory, preview, global search) run on their own
//! threads and talk back to the reducer exclusively through the action sink.
//! Each worker drains its queue before starting work so only the latest
//! request wins; the reducer drops results whose generation is stale.
//!
//! # Caution:
//! This module is a protocol boundary between the loop and the workers.
//! Changes to request/result shapes ripple into the reducer and the UI.

use crate::app::actions::Action;
use crate::core::fsx::load_directory;
use crate::core::preview::build_preview;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Capacity of the action queue between workers/input and the reducer.
const ACTION_QUEUE_CAPACITY: usize = 256;

/// Directories skipped by the recursive search walker.
#[rustfmt::skip]
const SEARCH_EXCLUDES: &[&str] = &[
    ".git", ".hg", ".svn", ".rustup", ".cargo", "target", "node_modules",
    "dist", "venv", ".venv", "__pycache__", "build", "out",
];

/// Sink through which every action reaches the reducer, in offer order.
///
/// `dispatch` is a non-blocking offer with a blocking fallback so workers
/// never drop results and the input thread never reorders them.
#[derive(Clone)]
pub struct ActionSink {
    tx: Sender<Action>,
}

impl ActionSink {
    pub fn dispatch(&self, action: Action) {
        match self.tx.try_send(action) {
            Ok(()) => {}
            Err(TrySendError::Full(action)) => {
                let _ = self.tx.send(action);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Creates the bounded action queue shared by input mapping and workers.
pub fn action_channel() -> (ActionSink, Receiver<Action>) {
    let (tx, rx) = bounded(ACTION_QUEUE_CAPACITY);
    (ActionSink { tx }, rx)
}

pub struct DirRequest {
    pub path: PathBuf,
    /// Parent directory to list for the sidebar, when one exists.
    pub parent: Option<PathBuf>,
    pub generation: u64,
}

pub struct PreviewRequest {
    pub entry: crate::core::fsx::FileEntry,
    pub generation: u64,
    pub byte_limit: usize,
    pub formatted_width: usize,
}

pub struct SearchRequest {
    pub base_dir: PathBuf,
    pub query: String,
    pub generation: u64,
    pub max_results: usize,
    pub cancel: Arc<AtomicBool>,
}

/// One global-search hit. `spans` are byte ranges into `relative` matched
/// by the query; the UI translates them to display columns and never
/// recomputes them.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub path: PathBuf,
    pub relative: String,
    pub is_dir: bool,
    pub score: i64,
    pub spans: Vec<(usize, usize)>,
}

/// Handles to the loader threads.
pub struct Loaders {
    dir_tx: Sender<DirRequest>,
    preview_tx: Sender<PreviewRequest>,
    search_tx: Sender<SearchRequest>,
}

impl Loaders {
    /// Spawns the three workers. Results flow back through `sink`.
    pub fn spawn(sink: ActionSink) -> Self {
        let (dir_tx, dir_rx) = unbounded::<DirRequest>();
        let (preview_tx, preview_rx) = unbounded::<PreviewRequest>();
        let (search_tx, search_rx) = unbounded::<SearchRequest>();

        start_dir_worker(dir_rx, sink.clone());
        start_preview_worker(preview_rx, sink.clone());
        start_search_worker(search_rx, sink);

        Self {
            dir_tx,
            preview_tx,
            search_tx,
        }
    }

    pub fn request_directory(&self, path: PathBuf, parent: Option<PathBuf>, generation: u64) {
        let _ = self.dir_tx.send(DirRequest {
            path,
            parent,
            generation,
        });
    }

    pub fn request_preview(&self, request: PreviewRequest) {
        let _ = self.preview_tx.send(request);
    }

    pub fn request_search(&self, request: SearchRequest) {
        let _ = self.search_tx.send(request);
    }
}

fn start_dir_worker(task_rx: Receiver<DirRequest>, sink: ActionSink) {
    thread::spawn(move || {
        while let Ok(mut req) = task_rx.recv() {
            // Only the newest queued request is worth loading.
            while let Ok(next) = task_rx.try_recv() {
                req = next;
            }

            tracing::debug!(path = %req.path.display(), generation = req.generation, "loading directory");
            let result = load_directory(&req.path).map_err(|e| e.status_line());
            // Sidebar content rides along so a queued navigation can never
            // orphan the parent listing.
            let parent_entries = req
                .parent
                .as_deref()
                .and_then(|p| load_directory(p).ok())
                .unwrap_or_default();
            sink.dispatch(Action::DirectoryLoaded {
                path: req.path,
                generation: req.generation,
                result: result.map(|entries| (entries, parent_entries)),
            });
        }
    });
}

fn start_preview_worker(task_rx: Receiver<PreviewRequest>, sink: ActionSink) {
    thread::spawn(move || {
        while let Ok(mut req) = task_rx.recv() {
            while let Ok(next) = task_rx.try_recv() {
                req = next;
            }

            tracing::debug!(
                name = req.entry.name_str(),
                generation = req.generation,
                "building preview"
            );
            let result = build_preview(&req.entry, req.byte_limit, req.formatted_width)
                .map(Box::new)
                .map_err(|e| e.status_line());
            sink.dispatch(Action::PreviewReady {
                generation: req.generation,
                result,
            });
        }
    });
}

fn start_search_worker(task_rx: Receiver<SearchRequest>, sink: ActionSink) {
    thread::spawn(move || {
        while let Ok(mut req) = task_rx.recv() {
            while let Ok(next) = task_rx.try_recv() {
                req = next;
            }

            if req.query.is_empty() {
                sink.dispatch(Action::GlobalSearchResults {
                    generation: req.generation,
                    results: Vec::new(),
                    scanned: 0,
                });
                continue;
            }

            let mut results = Vec::new();
            let scanned = run_search(&req, &mut results);

            if req.cancel.load(Ordering::Acquire) {
                continue;
            }
            sink.dispatch(Action::GlobalSearchResults {
                generation: req.generation,
                results,
                scanned,
            });
        }
    });
}

/// Walks `base_dir` recursively, fuzzy-scoring each relative path against
/// the query. Returns the number of entries scanned; hits land in `out`
/// sorted by descending score and capped at `max_results`.
fn run_search(req: &SearchRequest, out: &mut Vec<SearchResult>) -> usize {
    let matcher = SkimMatcherV2::default();
    let mut scanned = 0usize;
    let mut stack = vec![req.base_dir.clone()];

    while let Some(dir) = stack.pop() {
        if req.cancel.load(Ordering::Relaxed) {
            return scanned;
        }
        let Ok(read) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in read.flatten() {
            if req.cancel.load(Ordering::Relaxed) {
                return scanned;
            }
            scanned += 1;

            let path = entry.path();
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);

            if is_dir && !SEARCH_EXCLUDES.contains(&name_str.as_ref()) && !name_str.starts_with('.')
            {
                stack.push(path.clone());
            }

            let relative = relative_display(&path, &req.base_dir);
            if let Some((score, indices)) = matcher.fuzzy_indices(&relative, &req.query) {
                out.push(SearchResult {
                    spans: indices_to_spans(&relative, &indices),
                    path,
                    relative,
                    is_dir,
                    score,
                });
            }
        }
    }

    out.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    out.truncate(req.max_results);
    scanned
}

fn relative_display(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    let s = rel.to_string_lossy().into_owned();
    #[cfg(windows)]
    {
        s.replace('\\', "/")
    }
    #[cfg(not(windows))]
    {
        s
    }
}

/// Collapses the matcher's per-char indices into contiguous byte spans.
fn indices_to_spans(haystack: &str, char_indices: &[usize]) -> Vec<(usize, usize)> {
    let byte_of: Vec<usize> = haystack
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(haystack.len()))
        .collect();

    let mut spans: Vec<(usize, usize)> = Vec::new();
    for &ci in char_indices {
        if ci + 1 >= byte_of.len() {
            continue;
        }
        let (start, end) = (byte_of[ci], byte_of[ci + 1]);
        match spans.last_mut() {
            Some(last) if last.1 == start => last.1 = end,
            _ => spans.push((start, end)),
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_merge_adjacent_chars() {
        let spans = indices_to_spans("src/main.rs", &[0, 1, 2, 4]);
        assert_eq!(spans, vec![(0, 3), (4, 5)]);
    }

    #[test]
    fn spans_handle_multibyte() {
        let s = "héllo";
        // chars: h(0) é(1..3) l(3..4) ...
        let spans = indices_to_spans(s, &[1, 2]);
        assert_eq!(spans, vec![(1, 4)]);
    }
}

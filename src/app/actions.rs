//! The action union for rdir.
//!
//! Every mutation of [AppState](crate::app::AppState) is described by one
//! variant here and applied by the reducer. Keeping the list exhaustive lets
//! the compiler flag unhandled cases when the set grows.

use crate::core::fsx::FileEntry;
use crate::core::preview::PreviewData;
use crate::core::worker::SearchResult;

use std::path::PathBuf;

/// Direction for history traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    Back,
    Forward,
}

/// Cursor movement inside the global-search query editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Left,
    Right,
    WordLeft,
    WordRight,
    Home,
    End,
}

/// Up/down movement in a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListDirection {
    Up,
    Down,
}

/// Every action the reducer understands.
#[derive(Debug)]
pub enum Action {
    // Navigation
    NavigateUp,
    NavigateDown,
    ScrollPageUp,
    ScrollPageDown,
    ScrollToStart,
    ScrollToEnd,
    EnterDirectory,
    GoUp,
    GoHome,
    GoToPath { path: PathBuf },
    GoToHistory { direction: HistoryDirection },
    RefreshDirectory,
    /// Context-sensitive: enters a directory, or opens the inline preview
    /// full screen for a file.
    RightArrow,
    Resize { width: u16, height: u16 },

    // Filter
    FilterStart,
    FilterChar { ch: char },
    FilterBackspace,
    FilterResetQuery,
    FilterClear,

    // Global search
    GlobalSearchStart,
    GlobalSearchChar { ch: char },
    GlobalSearchBackspace,
    GlobalSearchDelete,
    GlobalSearchDeleteWord,
    GlobalSearchMoveCursor { direction: CursorMove },
    GlobalSearchNavigate { direction: ListDirection },
    GlobalSearchPageUp,
    GlobalSearchPageDown,
    GlobalSearchResetQuery,
    GlobalSearchClear,
    GlobalSearchOpen,
    GlobalSearchSelectIndex { index: usize },

    // Preview
    PreviewEnterFullScreen,
    PreviewExitFullScreen,
    PreviewScrollUp,
    PreviewScrollDown,
    PreviewScrollPageUp,
    PreviewScrollPageDown,
    PreviewScrollToStart,
    PreviewScrollToEnd,
    TogglePreviewWrap,

    // External
    YankPath,
    OpenEditor,
    OpenPager,

    // Lifecycle
    Quit,
    QuitAndChange,
    ToggleHiddenFiles,
    HelpToggle,
    HelpShow,
    HelpHide,
    MouseSelect { display_index: usize },

    // Async results
    DirectoryLoaded {
        path: PathBuf,
        generation: u64,
        /// Entries of the loaded directory plus the sidebar's parent
        /// siblings (empty at the filesystem root).
        result: Result<(Vec<FileEntry>, Vec<FileEntry>), String>,
    },
    PreviewReady {
        generation: u64,
        result: Result<Box<PreviewData>, String>,
    },
    GlobalSearchResults {
        generation: u64,
        results: Vec<SearchResult>,
        scanned: usize,
    },
}

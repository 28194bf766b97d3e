//! Application state for rdir.
//!
//! [AppState] is the single source of truth. Only the reducer mutates it on
//! the main loop; the pager mutates a small documented subset (preview
//! scroll offsets, wrap flag, last error, yank time, and the persisted
//! streaming lines). Loaders never touch it directly — they post actions.

use crate::config::Config;
use crate::core::external::ExternalTools;
use crate::core::fsx::FileEntry;
use crate::core::preview::PreviewData;
use crate::core::worker::{ActionSink, Loaders, PreviewRequest};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Debounce between a selection change and the issued preview request,
/// roughly the key-repeat cadence.
const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(75);
/// How long the red error flash stays in the status line.
const ERROR_FLASH: Duration = Duration::from_millis(1500);
/// How long the green yank flash stays on the path row.
const YANK_FLASH: Duration = Duration::from_millis(100);
/// Spinner glyphs cycled while a preview loads, one step per 100 ms.
const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// How the process should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitMode {
    /// Plain quit, nothing printed.
    Quit,
    /// Print the final path on stdout so a shell wrapper can `cd` into it.
    QuitAndChange,
}

/// A modal hand-off the terminal loop must perform after the current
/// action: both need exclusive terminal ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalRequest {
    Editor,
    Pager,
}

pub struct AppState {
    pub config: Config,

    // Navigation
    pub current_path: PathBuf,
    pub files: Vec<FileEntry>,
    pub parent_entries: Vec<FileEntry>,
    pub history: Vec<PathBuf>,
    pub history_index: usize,
    /// Index into `files` (the unfiltered list).
    pub selected_index: usize,
    /// First visible display row of the file list.
    pub scroll_offset: usize,
    pub screen_width: u16,
    pub screen_height: u16,

    // View flags
    pub hide_hidden_files: bool,
    pub filter_active: bool,
    pub filter_query: String,
    pub search: crate::app::search::GlobalSearchState,
    pub help_visible: bool,

    // Preview
    pub preview_data: Option<PreviewData>,
    pub preview_loading: bool,
    pub preview_loading_started_at: Option<Instant>,
    pub preview_scroll_offset: usize,
    /// Row offset inside a wrapped source line.
    pub preview_wrap_offset: usize,
    pub preview_wrap: bool,
    pub preview_full_screen: bool,
    pub preview_prefer_raw: bool,

    // Capabilities
    pub tools: ExternalTools,

    // Transient
    pub last_error: Option<(String, Instant)>,
    pub last_yank_time: Option<Instant>,

    // Loaders and dispatch
    pub loaders: Loaders,
    pub sink: ActionSink,
    pub dir_generation: u64,
    pub preview_generation: u64,
    pub dir_loading: bool,
    preview_pending_since: Option<Instant>,

    // Saved cursor positions per directory
    saved_positions: HashMap<PathBuf, usize>,
    /// Entry to select once the pending directory load lands (set by
    /// `GoUp` so the exited directory stays under the cursor).
    pub pending_focus: Option<std::ffi::OsString>,

    // Set by the reducer, consumed by the terminal loop
    pub exit: Option<ExitMode>,
    pub external_request: Option<ExternalRequest>,
}

impl AppState {
    pub fn new(
        config: Config,
        start_path: PathBuf,
        loaders: Loaders,
        sink: ActionSink,
        tools: ExternalTools,
    ) -> Self {
        let hide_hidden_files = !config.show_hidden();
        let mut state = Self {
            config,
            current_path: start_path.clone(),
            files: Vec::new(),
            parent_entries: Vec::new(),
            history: vec![start_path],
            history_index: 0,
            selected_index: 0,
            scroll_offset: 0,
            screen_width: 80,
            screen_height: 24,
            hide_hidden_files,
            filter_active: false,
            filter_query: String::new(),
            search: Default::default(),
            help_visible: false,
            preview_data: None,
            preview_loading: false,
            preview_loading_started_at: None,
            preview_scroll_offset: 0,
            preview_wrap_offset: 0,
            preview_wrap: false,
            preview_full_screen: false,
            preview_prefer_raw: false,
            tools,
            last_error: None,
            last_yank_time: None,
            loaders,
            sink,
            dir_generation: 0,
            preview_generation: 0,
            dir_loading: false,
            preview_pending_since: None,
            saved_positions: HashMap::new(),
            pending_focus: None,
            exit: None,
            external_request: None,
        };
        state.request_directory_load();
        state
    }

    // Capability flags

    pub fn clipboard_available(&self) -> bool {
        self.tools.clipboard.is_some()
    }

    pub fn editor_available(&self) -> bool {
        self.tools.editor.is_some()
    }

    // Display list (filter + hidden flag applied)

    fn entry_displayed(&self, entry: &FileEntry) -> bool {
        if self.hide_hidden_files && entry.is_hidden() {
            return false;
        }
        if self.filter_query.is_empty() {
            return true;
        }
        entry
            .lowercase_name()
            .contains(&self.filter_query.to_lowercase())
    }

    /// Actual indices (into `files`) of the displayed entries, in order.
    pub fn display_indices(&self) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, e)| self.entry_displayed(e))
            .map(|(i, _)| i)
            .collect()
    }

    /// The filtered view of `files` the main panel shows.
    pub fn display_files(&self) -> Vec<&FileEntry> {
        self.files
            .iter()
            .filter(|e| self.entry_displayed(e))
            .collect()
    }

    pub fn display_len(&self) -> usize {
        self.files.iter().filter(|e| self.entry_displayed(e)).count()
    }

    /// Translates a display row to the actual index into `files`.
    pub fn actual_from_display(&self, display_index: usize) -> Option<usize> {
        self.display_indices().get(display_index).copied()
    }

    /// Translates the actual `selected_index` to its display row, when the
    /// selection is currently displayed.
    pub fn display_from_actual(&self, actual_index: usize) -> Option<usize> {
        self.display_indices()
            .iter()
            .position(|&i| i == actual_index)
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        if self.files.is_empty() {
            return None;
        }
        let entry = self.files.get(self.selected_index)?;
        self.entry_displayed(entry).then_some(entry)
    }

    /// Display row of the selection, if visible.
    pub fn selected_display_index(&self) -> Option<usize> {
        self.display_from_actual(self.selected_index)
    }

    // Selection

    /// Moves the selection by `delta` display rows, clamped at the ends.
    /// Returns true when the selection changed.
    pub fn move_selection(&mut self, delta: isize) -> bool {
        let indices = self.display_indices();
        if indices.is_empty() {
            return false;
        }
        let current = self
            .display_from_actual(self.selected_index)
            .unwrap_or(0);
        let target = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            (current + delta as usize).min(indices.len() - 1)
        };
        let changed = indices[target] != self.selected_index;
        self.selected_index = indices[target];
        self.ensure_selection_visible();
        changed
    }

    /// Selects a display row directly (mouse, jump keys).
    pub fn select_display(&mut self, display_index: usize) -> bool {
        let indices = self.display_indices();
        let Some(&actual) = indices.get(display_index) else {
            return false;
        };
        let changed = actual != self.selected_index;
        self.selected_index = actual;
        self.ensure_selection_visible();
        changed
    }

    /// Re-establishes the selection invariant after the underlying file set
    /// or filter changed: keep the entry if still displayed, otherwise the
    /// nearest surviving display row.
    pub fn remap_selection(&mut self) {
        if self.files.is_empty() {
            self.selected_index = 0;
            self.scroll_offset = 0;
            return;
        }
        let indices = self.display_indices();
        if indices.is_empty() {
            self.selected_index = 0;
            self.scroll_offset = 0;
            return;
        }
        if indices.contains(&self.selected_index) {
            self.ensure_selection_visible();
            return;
        }
        // Nearest surviving entry: first displayed at or after the old
        // actual position, else the last displayed before it.
        let next = indices.iter().find(|&&i| i > self.selected_index);
        let prev = indices.iter().rev().find(|&&i| i < self.selected_index);
        self.selected_index = next.or(prev).copied().unwrap_or(indices[0]);
        self.ensure_selection_visible();
    }

    /// Rows available for the file list (header + status chrome removed).
    pub fn list_viewport_rows(&self) -> usize {
        (self.screen_height as usize).saturating_sub(3).max(1)
    }

    /// Adjusts `scroll_offset` so the selected row is inside the viewport.
    pub fn ensure_selection_visible(&mut self) {
        let rows = self.list_viewport_rows();
        let Some(display) = self.selected_display_index() else {
            return;
        };
        if display < self.scroll_offset {
            self.scroll_offset = display;
        } else if display >= self.scroll_offset + rows {
            self.scroll_offset = display + 1 - rows;
        }
    }

    // Directory loading

    /// Issues an async load of the current directory (and its parent for
    /// the sidebar), superseding any in-flight load.
    pub fn request_directory_load(&mut self) {
        self.dir_generation = self.dir_generation.wrapping_add(1);
        self.dir_loading = true;
        let parent = self.current_path.parent().map(Path::to_path_buf);
        self.loaders.request_directory(
            self.current_path.clone(),
            parent,
            self.dir_generation,
        );
    }

    pub fn save_position(&mut self) {
        if !self.files.is_empty() {
            self.saved_positions
                .insert(self.current_path.clone(), self.selected_index);
        }
    }

    pub fn restore_position(&mut self) {
        self.selected_index = self
            .saved_positions
            .get(&self.current_path)
            .copied()
            .unwrap_or(0);
    }

    /// Switches to a new directory, recording history unless the move came
    /// from history traversal itself. Set `pending_focus` beforehand to
    /// select a child by name once the load completes (used by `GoUp`).
    pub fn navigate_to(&mut self, path: PathBuf, record_history: bool) {
        self.save_position();
        if record_history && path != self.current_path {
            self.history.truncate(self.history_index + 1);
            self.history.push(path.clone());
            self.history_index = self.history.len() - 1;
        }
        self.current_path = path;
        self.files.clear();
        self.parent_entries.clear();
        self.selected_index = 0;
        self.scroll_offset = 0;
        self.filter_active = false;
        self.filter_query.clear();
        self.clear_preview();
        self.request_directory_load();
    }

    // Preview plumbing

    pub fn clear_preview(&mut self) {
        self.preview_data = None;
        self.preview_loading = false;
        self.preview_loading_started_at = None;
        self.preview_pending_since = None;
        self.preview_scroll_offset = 0;
        self.preview_wrap_offset = 0;
    }

    /// Marks the preview dirty; the actual request goes out once the
    /// debounce window passes (see [AppState::tick]).
    pub fn schedule_preview(&mut self) {
        self.preview_scroll_offset = 0;
        self.preview_wrap_offset = 0;
        self.preview_loading = true;
        self.preview_loading_started_at = Some(Instant::now());
        self.preview_pending_since = Some(Instant::now());
    }

    /// Issues a debounce-pending preview request right away. Used by the
    /// barrier before modal hand-offs so the pager never waits on a
    /// request that was never sent.
    pub fn flush_pending_preview(&mut self) {
        if self.preview_pending_since.is_some() {
            self.generate_preview();
        }
    }

    /// Synchronously issues a preview request for the current selection.
    /// Also used by the pager on return to refresh what it mutated.
    pub fn generate_preview(&mut self) {
        self.preview_pending_since = None;
        let Some(entry) = self.selected_entry().cloned() else {
            self.clear_preview();
            return;
        };
        self.preview_generation = self.preview_generation.wrapping_add(1);
        self.preview_loading = true;
        self.preview_loading_started_at = Some(Instant::now());
        self.loaders.request_preview(PreviewRequest {
            entry,
            generation: self.preview_generation,
            byte_limit: self.config.preview_limit(),
            formatted_width: self.preview_pane_width(),
        });
    }

    /// Column budget the formatted view is reflowed against. The layout
    /// engine refines this; a rough width is fine for the builder.
    pub fn preview_pane_width(&self) -> usize {
        let w = self.screen_width as usize;
        (w * 2 / 5).clamp(28, 120)
    }

    /// Periodic bookkeeping driven by the main loop: fires debounced
    /// preview and search requests. Returns true when state changed.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;

        if let Some(since) = self.preview_pending_since
            && since.elapsed() >= PREVIEW_DEBOUNCE
        {
            self.generate_preview();
            changed = true;
        }

        if self.search.is_active() && self.search.take_due() {
            self.dispatch_search();
            changed = true;
        }

        changed
    }

    /// Sends the current global-search query to the walker.
    pub fn dispatch_search(&mut self) {
        let query = self.search.query();
        let (generation, cancel) = self.search.prepare_request();
        self.loaders
            .request_search(crate::core::worker::SearchRequest {
                base_dir: self.current_path.clone(),
                query,
                generation,
                max_results: self.config.max_search_results(),
                cancel,
            });
    }

    // Transient status

    pub fn set_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(error = %message, "status error");
        self.last_error = Some((message, Instant::now()));
    }

    pub fn active_error(&self) -> Option<&str> {
        match &self.last_error {
            Some((message, at)) if at.elapsed() < ERROR_FLASH => Some(message),
            _ => None,
        }
    }

    pub fn yank_flash_active(&self) -> bool {
        self.last_yank_time
            .map(|t| t.elapsed() < YANK_FLASH)
            .unwrap_or(false)
    }

    /// Spinner glyph for the loading indicator, one frame per 100 ms.
    pub fn spinner_frame(&self) -> Option<char> {
        let started = self.preview_loading_started_at?;
        if !self.preview_loading {
            return None;
        }
        let step = (started.elapsed().as_millis() / 100) as usize;
        Some(SPINNER_FRAMES[step % SPINNER_FRAMES.len()])
    }
}

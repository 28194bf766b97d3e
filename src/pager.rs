//! The full-screen pager.
//!
//! A modal component: while it runs, the main loop is suspended and the
//! pager owns the terminal. It pages over the resolved [PagerSource],
//! keeps wrap metrics in row space, runs the in-file search, and on clean
//! exit persists streamed lines back into the preview. The only
//! application state it mutates is the documented scoped subset: preview
//! scroll offsets, the wrap and raw/formatted flags, `last_error`,
//! `last_yank_time`, and the persisted preview lines.

pub mod clip;
pub mod draw;
pub mod search;
pub mod source;
pub mod wrap;

use crate::app::state::AppState;
use crate::core::format::StyledTextSegment;
use crate::core::fsx::FileEntry;
use crate::core::preview::build_preview;
use crate::core::text::{sgr_aware_width, trim_wrapped_prefix};
use crate::error::{Error, Result};
use crate::pager::draw::{inject_highlights, search_status, visible_spans};
use crate::pager::search::{SearchState, execute_search};
use crate::pager::source::PagerSource;
use crate::pager::wrap::RowMetrics;

use ansi_to_tui::IntoText;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use std::time::{Duration, Instant};

/// Shift+↑/↓ scroll step.
const FAST_SCROLL_LINES: usize = 10;
/// Transient status message lifetime.
const STATUS_LIFETIME: Duration = Duration::from_millis(1500);

/// How the pager session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerOutcome {
    /// Back to the browser; state was written back.
    Returned,
    /// `Ctrl+C`: quit the whole application, nothing written back.
    QuitApp,
}

enum StatusKind {
    Info,
    Error,
}

/// Prerendered formatted view: SGR rows plus their visible widths.
struct FormattedDoc {
    rows: Vec<String>,
    widths: Vec<usize>,
}

impl FormattedDoc {
    fn from_segments(segments: &[Vec<StyledTextSegment>], panel_width: usize) -> Self {
        let rows: Vec<String> = segments
            .iter()
            .map(|line| draw::segments_to_sgr(line, panel_width))
            .collect();
        let widths = rows.iter().map(|r| sgr_aware_width(r)).collect();
        Self { rows, widths }
    }
}

struct Pager<'a> {
    state: &'a mut AppState,
    entry: FileEntry,
    source: PagerSource,
    formatted: Option<FormattedDoc>,
    metrics: RowMetrics,
    metrics_formatted: bool,
    search: SearchState,
    show_info: bool,
    help_visible: bool,
    status: Option<(String, StatusKind, Instant)>,
    width: u16,
    height: u16,
}

/// Runs the pager for the current selection until the user leaves.
///
/// The caller owns terminal acquisition; this function only draws and
/// reads events, plus the suspend/resume pair around the editor hand-off.
pub fn run_pager<B>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<PagerOutcome>
where
    B: Backend,
    std::io::Error: From<<B as Backend>::Error>,
{
    let Some(entry) = state.selected_entry().cloned() else {
        return Ok(PagerOutcome::Returned);
    };
    let Some(preview) = state.preview_data.as_ref() else {
        state.set_error("preview not ready");
        return Ok(PagerOutcome::Returned);
    };

    let source = PagerSource::open(entry.path(), preview);
    let size = terminal.size().map_err(|e| Error::Terminal { source: e.into() })?;

    let mut pager = Pager {
        entry,
        source,
        formatted: None,
        metrics: RowMetrics::new(),
        metrics_formatted: false,
        search: SearchState::default(),
        show_info: false,
        help_visible: false,
        status: None,
        width: size.width,
        height: size.height,
        state,
    };
    pager.rebuild_formatted();

    let outcome = pager.event_loop(terminal)?;

    if outcome == PagerOutcome::Returned
        && let PagerSource::Text(text) = &mut pager.source
        && let Some(data) = pager.state.preview_data.as_mut()
        && let Err(e) = text.persist_loaded_lines(data)
    {
        pager.state.set_error(e.status_line());
    }
    pager.source.close();
    Ok(outcome)
}

impl Pager<'_> {
    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<PagerOutcome>
    where
        B: Backend,
        std::io::Error: From<<B as Backend>::Error>,
    {
        loop {
            self.ensure_row_metrics();
            terminal
                .draw(|frame| self.render(frame))
                .map_err(|e| Error::Terminal { source: e.into() })?;

            let timeout = self.poll_timeout();
            let has_event = event::poll(timeout).map_err(|e| Error::Terminal { source: e })?;

            if self.search.take_due() {
                self.run_search(self.search.input_query());
            }

            if !has_event {
                continue;
            }
            match event::read().map_err(|e| Error::Terminal { source: e })? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(outcome) = self.handle_key(terminal, key)? {
                        return Ok(outcome);
                    }
                }
                Event::Resize(w, h) => {
                    self.width = w;
                    self.height = h;
                }
                _ => {}
            }
        }
    }

    fn poll_timeout(&self) -> Duration {
        let base = Duration::from_millis(100);
        match self.search.next_wakeup() {
            Some(at) => at.saturating_duration_since(Instant::now()).min(base),
            None => base,
        }
    }

    // Geometry

    fn content_rows(&self) -> usize {
        let chrome = 2 + usize::from(self.show_info);
        (self.height as usize).saturating_sub(chrome).max(1)
    }

    fn content_width(&self) -> usize {
        (self.width as usize).max(1)
    }

    fn viewing_formatted(&self) -> bool {
        self.formatted.is_some() && !self.state.preview_prefer_raw
    }

    fn rebuild_formatted(&mut self) {
        self.formatted = self
            .state
            .preview_data
            .as_ref()
            .filter(|d| d.has_formatted())
            .map(|d| FormattedDoc::from_segments(&d.formatted_segments, self.content_width()));
    }

    fn known_line_count(&self) -> usize {
        if self.viewing_formatted() {
            self.formatted.as_ref().map(|f| f.rows.len()).unwrap_or(0)
        } else {
            self.source.line_count()
        }
    }

    fn line_width_of(&mut self, idx: usize) -> usize {
        if self.viewing_formatted() {
            self.formatted
                .as_ref()
                .and_then(|f| f.widths.get(idx).copied())
                .unwrap_or(0)
        } else {
            match &mut self.source {
                PagerSource::Directory(d) => {
                    d.row(idx).map(crate::core::text::display_width).unwrap_or(0)
                }
                PagerSource::Text(t) => t.line_width(idx),
                PagerSource::Binary(_) => crate::ui::layout::hex_row_width(
                    crate::ui::layout::BinaryMode::Full,
                ),
            }
        }
    }

    /// Rebuilds the row-metrics table when width/wrap/view changed, or
    /// extends it when the streaming source grew.
    fn ensure_row_metrics(&mut self) {
        let width = self.content_width();
        // Wrap is never applied to binary sources.
        let wrap = self.state.preview_wrap && !self.source.is_binary();
        let formatted = self.viewing_formatted();

        if self.metrics.stale_for(width, wrap) || self.metrics_formatted != formatted {
            let widths: Vec<usize> = (0..self.known_line_count())
                .map(|i| self.line_width_of(i))
                .collect();
            self.metrics.rebuild(widths, width, wrap);
            self.metrics_formatted = formatted;
            return;
        }

        let known = self.known_line_count();
        if self.metrics.line_count() < known {
            let widths: Vec<usize> = (self.metrics.line_count()..known)
                .map(|i| self.line_width_of(i))
                .collect();
            self.metrics.extend(widths);
        }
    }

    // Scrolling (all in row space)

    fn current_row(&self) -> usize {
        self.metrics
            .row_of(self.state.preview_scroll_offset, self.state.preview_wrap_offset)
    }

    fn set_row(&mut self, row: usize) {
        let max_start = self
            .metrics
            .total_rows()
            .saturating_sub(self.content_rows());
        let row = row.min(max_start);
        let (line, wrap_offset) = self.metrics.line_at_row(row);
        self.state.preview_scroll_offset = line;
        self.state.preview_wrap_offset = wrap_offset;
    }

    fn scroll_rows(&mut self, delta: isize) {
        if delta > 0 {
            // Streaming sources may need more lines before the clamp makes
            // sense; fetch one viewport past the target.
            let want = self.state.preview_scroll_offset + delta as usize + self.content_rows();
            if let PagerSource::Text(text) = &mut self.source
                && let Err(e) = text.ensure_line(want)
            {
                self.set_status(e.status_line(), StatusKind::Error);
            }
            self.ensure_row_metrics();
        }
        let current = self.current_row();
        let target = if delta.is_negative() {
            current.saturating_sub(delta.unsigned_abs())
        } else {
            current + delta as usize
        };
        self.set_row(target);
    }

    fn scroll_to_end(&mut self) {
        if let PagerSource::Text(text) = &mut self.source
            && let Err(e) = text.ensure_all()
        {
            self.set_status(e.status_line(), StatusKind::Error);
        }
        self.ensure_row_metrics();
        let total = self.metrics.total_rows();
        self.set_row(total.saturating_sub(self.content_rows()));
    }

    // Search

    fn run_search(&mut self, query: String) {
        if query.is_empty() {
            self.search.hits.clear();
            self.search.query.clear();
            self.search.error = false;
            self.search.limited = false;
            return;
        }
        match execute_search(&mut self.source, &query) {
            Ok(outcome) => {
                self.search.query = query;
                self.search.hits = outcome.hits;
                self.search.limited = outcome.limited;
                self.search.error = false;
                self.search.focused = 0;
                self.search
                    .focus_at_or_after(self.state.preview_scroll_offset);
            }
            Err(e) => {
                self.search.query = query;
                self.search.hits.clear();
                self.search.error = true;
                self.search.limited = false;
                tracing::debug!(error = %e, "pager search failed");
            }
        }
        self.ensure_row_metrics();
    }

    /// Scrolls so the focused hit sits near the middle of the viewport.
    fn focus_current_hit(&mut self) {
        let Some(hit) = self.search.focused_hit().copied() else {
            return;
        };
        if let PagerSource::Text(text) = &mut self.source
            && let Err(e) = text.ensure_line(hit.line)
        {
            self.set_status(e.status_line(), StatusKind::Error);
        }
        self.ensure_row_metrics();
        let row = self.metrics.first_row_of(hit.line);
        self.set_row(row.saturating_sub(self.content_rows() / 2));
    }

    // Status

    fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) {
        let message = message.into();
        if matches!(kind, StatusKind::Error) {
            self.state.set_error(message.clone());
        }
        self.status = Some((message, kind, Instant::now()));
    }

    // Keys

    fn handle_key<B>(
        &mut self,
        terminal: &mut Terminal<B>,
        key: KeyEvent,
    ) -> Result<Option<PagerOutcome>>
    where
        B: Backend,
        std::io::Error: From<<B as Backend>::Error>,
    {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(Some(PagerOutcome::QuitApp));
        }

        if self.search.input_active {
            self.handle_search_input_key(key);
            return Ok(None);
        }

        if self.help_visible {
            match key.code {
                KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc | KeyCode::Left => {
                    self.help_visible = false;
                }
                _ => {}
            }
            return Ok(None);
        }

        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Up if shift => self.scroll_rows(-(FAST_SCROLL_LINES as isize)),
            KeyCode::Down if shift => self.scroll_rows(FAST_SCROLL_LINES as isize),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_rows(-1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_rows(1),
            KeyCode::PageUp | KeyCode::Char('b') => {
                self.scroll_rows(-(self.content_rows() as isize))
            }
            KeyCode::PageDown | KeyCode::Char(' ') => {
                self.scroll_rows(self.content_rows() as isize)
            }
            KeyCode::Home | KeyCode::Char('g') => self.set_row(0),
            KeyCode::End | KeyCode::Char('G') => self.scroll_to_end(),
            KeyCode::Char('w') | KeyCode::Right => {
                if !self.source.is_binary() {
                    self.state.preview_wrap = !self.state.preview_wrap;
                    self.state.preview_wrap_offset = 0;
                }
            }
            KeyCode::Char('f') => {
                if self.formatted.is_some() {
                    self.state.preview_prefer_raw = !self.state.preview_prefer_raw;
                    self.state.preview_scroll_offset = 0;
                    self.state.preview_wrap_offset = 0;
                }
            }
            KeyCode::Char('i') => self.show_info = !self.show_info,
            KeyCode::Char('e') => self.open_editor(terminal)?,
            KeyCode::Char('c') => self.copy_visible(),
            KeyCode::Char('C') => self.copy_all(),
            KeyCode::Char('/') => self.search.begin_input(),
            KeyCode::Char('n') => {
                self.search.advance(true);
                self.focus_current_hit();
            }
            KeyCode::Char('N') => {
                self.search.advance(false);
                self.focus_current_hit();
            }
            KeyCode::Char('?') | KeyCode::Char('h') => self.help_visible = true,
            KeyCode::Enter => {
                if self.search.query.is_empty() {
                    self.scroll_rows(self.content_rows() as isize);
                } else {
                    self.focus_current_hit();
                }
            }
            KeyCode::Char('q') | KeyCode::Char('x') | KeyCode::Left | KeyCode::Esc => {
                return Ok(Some(PagerOutcome::Returned));
            }
            _ => {}
        }
        Ok(None)
    }

    fn handle_search_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.search.cancel_input(),
            KeyCode::Enter => {
                self.search.cancel_input();
                self.run_search(self.search.input_query());
                self.focus_current_hit();
            }
            KeyCode::Backspace => self.search.backspace(),
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.push(ch);
            }
            _ => {}
        }
    }

    // Clipboard

    fn copy_visible(&mut self) {
        let Some(clip) = self.state.tools.clipboard.clone() else {
            self.set_status("no clipboard tool available", StatusKind::Error);
            return;
        };
        let rows = self.build_visible_rows(false);
        match clip::copy_visible(&clip, &rows) {
            Ok(message) => {
                self.state.last_yank_time = Some(Instant::now());
                self.set_status(message, StatusKind::Info);
            }
            Err(e) => self.set_status(e.status_line(), StatusKind::Error),
        }
    }

    fn copy_all(&mut self) {
        let Some(clip) = self.state.tools.clipboard.clone() else {
            self.set_status("no clipboard tool available", StatusKind::Error);
            return;
        };
        match clip::copy_all(&clip, &mut self.source) {
            Ok(message) => {
                self.state.last_yank_time = Some(Instant::now());
                self.set_status(message, StatusKind::Info);
            }
            Err(e) => self.set_status(e.status_line(), StatusKind::Error),
        }
        self.ensure_row_metrics();
    }

    // Editor hand-off

    fn open_editor<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: Backend,
        std::io::Error: From<<B as Backend>::Error>,
    {
        if self.entry.is_dir() {
            return Ok(());
        }
        let Some(editor) = self.state.tools.editor.clone() else {
            self.set_status("no editor configured", StatusKind::Error);
            return Ok(());
        };

        let saved_line = self.state.preview_scroll_offset;
        let saved_wrap_offset = self.state.preview_wrap_offset;
        self.source.close();

        crate::core::terminal::suspend()?;
        let result =
            crate::core::external::run_with_terminal(&editor, self.entry.path(), "editor");
        crate::core::terminal::resume()?;
        terminal
            .clear()
            .map_err(|e| Error::Terminal { source: e.into() })?;

        if let Err(e) = result {
            self.set_status(e.status_line(), StatusKind::Error);
        }

        // The file may have changed shape entirely: rebuild the preview,
        // reopen the source, stream back to where the user was.
        match build_preview(
            &self.entry,
            self.state.config.preview_limit(),
            self.state.preview_pane_width(),
        ) {
            Ok(data) => {
                self.state.preview_data = Some(data);
                let preview = self.state.preview_data.as_ref().expect("just set");
                self.source = PagerSource::open(self.entry.path(), preview);
                self.rebuild_formatted();
                if let PagerSource::Text(text) = &mut self.source
                    && let Err(e) = text.ensure_line(saved_line)
                {
                    self.set_status(e.status_line(), StatusKind::Error);
                }
                self.metrics = RowMetrics::new();
                self.ensure_row_metrics();
                self.state.preview_scroll_offset = saved_line;
                self.state.preview_wrap_offset = saved_wrap_offset;
                self.set_row(self.current_row());
            }
            Err(e) => {
                self.set_status(e.status_line(), StatusKind::Error);
            }
        }
        self.search.clear();
        Ok(())
    }

    // Rendering

    /// Builds the strings for the currently visible rows, highlights
    /// applied when `with_highlights`. Shared by the renderer and `c`.
    fn build_visible_rows(&mut self, with_highlights: bool) -> Vec<String> {
        let width = self.content_width();
        let rows = self.content_rows();
        let start_line = self.state.preview_scroll_offset;
        let start_wrap = self.state.preview_wrap_offset;
        let wrap = self.metrics.wrap();

        let mut out = Vec::with_capacity(rows);
        let mut line_idx = start_line;
        let mut row_in_line = if wrap { start_wrap } else { 0 };

        while out.len() < rows {
            if line_idx >= self.known_line_count() {
                break;
            }
            let full = self.render_line(line_idx);
            let skip_cols = if wrap { row_in_line * width } else { 0 };
            let visible = if skip_cols > 0 {
                trim_wrapped_prefix(&full, skip_cols)
            } else {
                full
            };

            let rendered = if with_highlights {
                let spans = visible_spans(&self.search, line_idx, skip_cols, width);
                inject_highlights(&visible, &spans, width)
            } else {
                inject_highlights(&visible, &[], width)
            };
            out.push(rendered);

            let span = self.metrics.row_span(line_idx);
            if wrap && row_in_line + 1 < span {
                row_in_line += 1;
            } else {
                line_idx += 1;
                row_in_line = 0;
            }
        }
        out
    }

    /// Full (untrimmed) content of one source line in the active view.
    fn render_line(&mut self, idx: usize) -> String {
        if self.viewing_formatted() {
            return self
                .formatted
                .as_ref()
                .and_then(|f| f.rows.get(idx).cloned())
                .unwrap_or_default();
        }
        match &mut self.source {
            PagerSource::Directory(d) => d.row(idx).unwrap_or_default().to_string(),
            PagerSource::Text(t) => t.line(idx).unwrap_or_default(),
            PagerSource::Binary(b) => b.line(idx).unwrap_or_default(),
        }
    }

    fn render(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        self.width = area.width;
        self.height = area.height;
        self.ensure_row_metrics();

        // Header
        let header = self.header_line();
        frame.render_widget(
            Paragraph::new(header).style(Style::default().add_modifier(Modifier::REVERSED)),
            Rect::new(0, 0, area.width, 1),
        );

        // Content
        let content_area = Rect::new(0, 1, area.width, self.content_rows() as u16);
        let raw = self.build_visible_rows(true).join("\n");
        let text = raw.into_text().unwrap_or_else(|_| Text::from(raw));
        frame.render_widget(Paragraph::new(text), content_area);

        // Info line
        if self.show_info {
            let info = self.info_line();
            frame.render_widget(
                Paragraph::new(info).style(Style::default().add_modifier(Modifier::DIM)),
                Rect::new(0, area.height.saturating_sub(2), area.width, 1),
            );
        }

        // Status line
        let status = self.status_line();
        frame.render_widget(
            Paragraph::new(status),
            Rect::new(0, area.height.saturating_sub(1), area.width, 1),
        );

        if self.help_visible {
            self.render_help(frame);
        }
    }

    fn header_line(&self) -> Line<'static> {
        let total = self.metrics.total_rows();
        let row = self.current_row().min(total.saturating_sub(1));
        let percent = if total <= 1 {
            100
        } else {
            (row * 100) / (total.saturating_sub(1)).max(1)
        };
        let kind = match &self.source {
            PagerSource::Directory(_) => "dir",
            PagerSource::Text(_) if self.viewing_formatted() => "formatted",
            PagerSource::Text(_) => "text",
            PagerSource::Binary(_) => "binary",
        };
        Line::from(vec![
            Span::styled(
                format!(" {} ", crate::core::text::sanitize(self.entry.name_str())),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("[{kind}]  {percent}%  ")),
            Span::raw(if self.state.preview_wrap { "wrap " } else { "" }),
        ])
    }

    fn info_line(&self) -> Line<'static> {
        let mut parts: Vec<String> = Vec::new();
        parts.push(humansize::format_size(self.entry.size(), humansize::BINARY));
        if let Some(modified) = self.entry.modified() {
            let dt: chrono::DateTime<chrono::Local> = modified.into();
            parts.push(dt.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        match &self.source {
            PagerSource::Text(t) => {
                parts.push(t.encoding().label().to_string());
                parts.push(format!("{} lines", t.line_count()));
                parts.push(format!("{} chars", t.char_count()));
                if !t.fully_loaded() {
                    parts.push("partially loaded".to_string());
                }
            }
            PagerSource::Binary(b) => {
                parts.push(format!("{} rows of 16 bytes", b.line_count()));
            }
            PagerSource::Directory(d) => {
                parts.push(format!("{} entries", d.rows.len()));
            }
        }
        parts.push(format!("mode {:o}", self.entry.mode() & 0o7777));
        Line::from(format!(" {}", parts.join("  ·  ")))
    }

    fn status_line(&self) -> Line<'static> {
        if let Some(search) = search_status(&self.search) {
            return Line::from(search);
        }
        if let Some((message, kind, at)) = &self.status
            && at.elapsed() < STATUS_LIFETIME
        {
            let style = match kind {
                StatusKind::Info => Style::default().fg(ratatui::style::Color::Green),
                StatusKind::Error => Style::default().fg(ratatui::style::Color::Red),
            };
            return Line::from(Span::styled(format!(" {message}"), style));
        }
        Line::from(Span::styled(
            " /search  n/N hits  w wrap  f view  c/C copy  e edit  q back  ? help",
            Style::default().add_modifier(Modifier::DIM),
        ))
    }

    fn render_help(&self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let entries = draw::help_entries();
        let height = (entries.len() as u16 + 4).min(area.height);
        let width = 58.min(area.width);
        let rect = Rect::new(
            (area.width.saturating_sub(width)) / 2,
            (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );

        let mut lines = vec![Line::from("")];
        for (keys, what) in entries {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {keys:<20}"),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(*what),
            ]));
        }

        frame.render_widget(Clear, rect);
        frame.render_widget(
            Paragraph::new(Text::from(lines)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" pager keys "),
            ),
            rect,
        );
    }
}

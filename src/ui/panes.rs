//! Pane drawing for rdir.
//!
//! Sidebar, main file list, global-search panel and the preview pane. All
//! text passes through the grapheme-cluster pipeline in `core::text`; every
//! row is clipped to its panel with `…`.

use crate::app::state::AppState;
use crate::core::format::{SegmentStyle, StyledTextSegment};
use crate::core::fsx::FileEntry;
use crate::core::text::{display_width, sanitize, truncate_to_width};
use crate::ui::layout::{BinaryMode, clip_hex_row};

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;

/// Icon glyph for an entry: `/` directory, `@` symlink, space otherwise.
fn icon_for(entry: &FileEntry) -> char {
    if entry.is_dir() {
        '/'
    } else if entry.is_symlink() {
        '@'
    } else {
        ' '
    }
}

/// Draws the parent-sibling sidebar, the row matching the current
/// directory highlighted and kept roughly centred.
pub fn draw_sidebar(frame: &mut Frame, state: &AppState, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let theme = state.config.theme();
    let current_name = state
        .current_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let highlighted = state
        .parent_entries
        .iter()
        .position(|e| e.name_str() == current_name);

    let rows = area.height as usize;
    let scroll = match highlighted {
        Some(idx) if state.parent_entries.len() > rows => {
            idx.saturating_sub(rows / 2)
                .min(state.parent_entries.len() - rows)
        }
        _ => 0,
    };

    let mut lines: Vec<Line> = Vec::with_capacity(rows);
    for (offset, entry) in state.parent_entries.iter().skip(scroll).take(rows).enumerate() {
        let idx = scroll + offset;
        let name = truncate_to_width(&sanitize(entry.name_str()), area.width as usize);
        let mut style = if entry.is_dir() {
            Style::default().fg(theme.directory)
        } else {
            Style::default()
        };
        if entry.is_hidden() {
            style = style.fg(theme.hidden);
        }
        if Some(idx) == highlighted {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(Span::styled(name, style)));
    }

    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

/// Draws the main file list with icons, hidden-dim rows and an inverted
/// selection bar.
pub fn draw_file_list(frame: &mut Frame, state: &AppState, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let theme = state.config.theme();
    let display = state.display_files();

    if display.is_empty() {
        let message = if state.dir_loading {
            "loading…"
        } else if !state.filter_query.is_empty() {
            "[no matches for this filter]"
        } else {
            "[empty]"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                message,
                Style::default().add_modifier(Modifier::DIM),
            )),
            area,
        );
        return;
    }

    let selected = state.selected_display_index();
    let rows = area.height as usize;
    let width = area.width as usize;

    let mut lines: Vec<Line> = Vec::with_capacity(rows);
    for (offset, entry) in display
        .iter()
        .copied()
        .skip(state.scroll_offset)
        .take(rows)
        .enumerate()
    {
        let display_idx = state.scroll_offset + offset;
        let name = truncate_to_width(
            &sanitize(entry.name_str()),
            width.saturating_sub(2),
        );

        let mut style = if entry.is_dir() {
            Style::default().fg(theme.directory)
        } else if entry.is_symlink() {
            Style::default().fg(theme.symlink)
        } else {
            Style::default()
        };
        if entry.is_hidden() {
            style = style.fg(theme.hidden);
        }
        if Some(display_idx) == selected {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let padded = format!("{}{}", icon_for(entry), name);
        lines.push(Line::from(Span::styled(padded, style)));
    }

    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

/// Score bucket color: green, light green, yellow, dark gray.
fn score_style(percent: u16) -> Style {
    use ratatui::style::Color;
    let color = if percent >= 80 {
        Color::Green
    } else if percent >= 60 {
        Color::LightGreen
    } else if percent >= 40 {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    Style::default().fg(color)
}

/// Draws the global-search panel: the query editor with a visible cursor
/// block, then the result list with match spans highlighted and a
/// right-aligned percentage score.
pub fn draw_search_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let search = &state.search;
    let width = area.width as usize;

    // Query editor row with a block cursor.
    let query: Vec<char> = search.query().chars().collect();
    let cursor = search.cursor().min(query.len());
    let before: String = query[..cursor].iter().collect();
    let at: String = query
        .get(cursor)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = query.get(cursor + 1..).map(|cs| cs.iter().collect()).unwrap_or_default();

    let edit_row = Line::from(vec![
        Span::styled("search> ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(sanitize(&before)),
        Span::styled(sanitize(&at), Style::default().add_modifier(Modifier::REVERSED)),
        Span::raw(sanitize(&after)),
    ]);
    frame.render_widget(Paragraph::new(edit_row), Rect::new(area.x, area.y, area.width, 1));

    if area.height <= 1 {
        return;
    }
    let list_area = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
    let rows = list_area.height as usize;

    let results = search.results();
    if results.is_empty() {
        let note = if search.query_is_empty() {
            "type to search recursively"
        } else if search.is_pending() {
            "searching…"
        } else {
            "[no results]"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(
                note,
                Style::default().add_modifier(Modifier::DIM),
            )),
            list_area,
        );
        return;
    }

    let max_score = results.iter().map(|r| r.score).max().unwrap_or(1).max(1);
    let mut lines: Vec<Line> = Vec::with_capacity(rows);

    for (offset, result) in results.iter().skip(search.scroll()).take(rows).enumerate() {
        let idx = search.scroll() + offset;
        let selected = idx == search.selected();
        let percent = ((result.score * 100) / max_score).clamp(0, 100) as u16;
        let score_text = format!("{percent:>3}%");

        let path_budget = width.saturating_sub(score_text.len() + 2);
        let mut spans =
            highlighted_path(&result.relative, &result.spans, path_budget, selected);

        let used: usize = spans.iter().map(|s| display_width(&s.content)).sum();
        let pad = path_budget.saturating_sub(used) + 1;
        spans.push(Span::raw(" ".repeat(pad)));
        spans.push(Span::styled(score_text, score_style(percent)));

        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(Text::from(lines)), list_area);
}

/// Renders a result path with its precomputed byte spans emphasized.
fn highlighted_path(
    relative: &str,
    byte_spans: &[(usize, usize)],
    budget: usize,
    selected: bool,
) -> Vec<Span<'static>> {
    let shown = truncate_to_width(&sanitize(relative), budget);
    let base = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let hit = base.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);

    // Spans are byte ranges into the original path; anything the
    // truncation dropped is simply not emphasized.
    let mut out: Vec<Span<'static>> = Vec::new();
    let mut cursor = 0usize;
    for &(start, end) in byte_spans {
        let start = start.min(shown.len());
        let end = end.min(shown.len());
        if start >= end || start < cursor {
            continue;
        }
        if !shown.is_char_boundary(start) || !shown.is_char_boundary(end) {
            continue;
        }
        if cursor < start {
            out.push(Span::styled(shown[cursor..start].to_string(), base));
        }
        out.push(Span::styled(shown[start..end].to_string(), hit));
        cursor = end;
    }
    if cursor < shown.len() {
        out.push(Span::styled(shown[cursor..].to_string(), base));
    }
    if out.is_empty() {
        out.push(Span::styled(shown, base));
    }
    out
}

/// Translates one styled segment to a themed ratatui span.
fn segment_span(seg: &StyledTextSegment, theme: &crate::config::Theme) -> Span<'static> {
    let style = match seg.style {
        SegmentStyle::Plain => Style::default(),
        SegmentStyle::Strong => Style::default().add_modifier(Modifier::BOLD),
        SegmentStyle::Emphasis => Style::default().add_modifier(Modifier::ITALIC),
        SegmentStyle::Heading => Style::default()
            .fg(theme.heading)
            .add_modifier(Modifier::BOLD),
        SegmentStyle::Code | SegmentStyle::CodeBlock => Style::default().fg(theme.code),
        SegmentStyle::Strike => Style::default().add_modifier(Modifier::CROSSED_OUT),
        SegmentStyle::Link => Style::default()
            .fg(theme.link)
            .add_modifier(Modifier::UNDERLINED),
        SegmentStyle::Rule => Style::default().fg(theme.rule),
    };
    Span::styled(sanitize(&seg.text), style)
}

/// Draws the preview pane: directory listing, styled formatted view, raw
/// text, or hex rows, honouring scroll and wrap offsets.
pub fn draw_preview(frame: &mut Frame, state: &AppState, area: Rect, binary_mode: BinaryMode) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let theme = state.config.theme();

    if state.preview_loading {
        let spinner = state.spinner_frame().unwrap_or('⠿');
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("{spinner} loading…"),
                Style::default().add_modifier(Modifier::DIM),
            )),
            area,
        );
        return;
    }

    let Some(data) = &state.preview_data else {
        return;
    };

    let rows = area.height as usize;
    let width = area.width as usize;
    let scroll = state.preview_scroll_offset;

    let mut lines: Vec<Line> = Vec::with_capacity(rows);

    if data.is_dir {
        for entry in data.dir_entries.iter().skip(scroll).take(rows) {
            let name = truncate_to_width(&sanitize(entry.name_str()), width.saturating_sub(2));
            let style = if entry.is_dir() {
                Style::default().fg(theme.directory)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{}{}", icon_for(entry), name),
                style,
            )));
        }
        if data.dir_entries.is_empty() {
            lines.push(Line::from(Span::styled(
                "[empty directory]",
                Style::default().add_modifier(Modifier::DIM),
            )));
        }
    } else if let Some(info) = &data.binary_info {
        if binary_mode == BinaryMode::None {
            lines.push(Line::from(Span::styled(
                "[binary file]",
                Style::default().add_modifier(Modifier::DIM),
            )));
        } else {
            for row in info.lines.iter().skip(scroll).take(rows) {
                lines.push(Line::from(clip_hex_row(row, binary_mode).to_string()));
            }
        }
    } else if data.has_formatted() && !state.preview_prefer_raw {
        for segs in data.formatted_segments.iter().skip(scroll).take(rows) {
            if segs.len() == 1 && segs[0].style == SegmentStyle::Rule {
                lines.push(Line::from(Span::styled(
                    "─".repeat(width),
                    Style::default().fg(theme.rule),
                )));
                continue;
            }
            let spans: Vec<Span> = segs.iter().map(|s| segment_span(s, theme)).collect();
            lines.push(Line::from(spans));
        }
    } else {
        append_text_rows(&mut lines, state, data, rows, width);
    }

    frame.render_widget(Paragraph::new(Text::from(lines)), area);
}

/// Raw text rows, wrapped when the wrap flag is set.
fn append_text_rows(
    lines: &mut Vec<Line<'static>>,
    state: &AppState,
    data: &crate::core::preview::PreviewData,
    rows: usize,
    width: usize,
) {
    let scroll = state.preview_scroll_offset;

    if !state.preview_wrap || width == 0 {
        for text in data.text_lines.iter().skip(scroll).take(rows) {
            lines.push(Line::from(truncate_to_width(text, width)));
        }
    } else {
        let mut line_idx = scroll;
        let mut wrap_row = state.preview_wrap_offset;
        while lines.len() < rows && line_idx < data.text_lines.len() {
            let text = &data.text_lines[line_idx];
            let skipped = crate::core::text::trim_wrapped_prefix(text, wrap_row * width);
            let visible = clip_to_width(&skipped, width);
            lines.push(Line::from(visible));

            let span = display_width(text).div_ceil(width.max(1)).max(1);
            if wrap_row + 1 < span {
                wrap_row += 1;
            } else {
                line_idx += 1;
                wrap_row = 0;
            }
        }
    }

    if data.truncated && lines.len() < rows {
        lines.push(Line::from(Span::styled(
            "… (more in the pager)",
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
}

/// Hard clip without an ellipsis; wrap continuation rows cut mid-word.
fn clip_to_width(s: &str, width: usize) -> String {
    use unicode_segmentation::UnicodeSegmentation;
    let mut out = String::new();
    let mut used = 0usize;
    for cluster in s.graphemes(true) {
        let w = crate::core::text::grapheme_width(cluster);
        if used + w > width {
            break;
        }
        out.push_str(cluster);
        used += w;
    }
    out
}

//! Frame composition for rdir.
//!
//! Renders header, sidebar, main panel, preview and the status region into
//! one frame, driven entirely by [AppState] and the computed
//! [LayoutMetrics].

use crate::app::state::AppState;
use crate::core::text::{display_width, sanitize, truncate_to_width};
use crate::ui::layout;
use crate::ui::{help, panes, status};

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::Paragraph;

/// Renders the entire browser UI for one frame.
pub fn render(frame: &mut Frame, state: &mut AppState) {
    let area = frame.area();
    state.screen_width = area.width;
    state.screen_height = area.height;
    if area.width == 0 || area.height == 0 {
        return;
    }

    let metrics = layout::compute(state);

    draw_header(frame, state, Rect::new(0, 0, area.width, 1));

    let content_height = area.height.saturating_sub(3);
    let content_y = 1u16;

    if state.preview_full_screen {
        // The inline preview takes the whole content region.
        let full = Rect::new(0, content_y, area.width, content_height);
        let mode = full_screen_binary_mode(state, area.width);
        panes::draw_preview(frame, state, full, mode);
    } else {
        if metrics.sidebar_width > 0 {
            let sidebar = Rect::new(
                0,
                content_y,
                metrics.sidebar_width as u16,
                content_height,
            );
            panes::draw_sidebar(frame, state, sidebar);
            draw_separator(
                frame,
                state,
                metrics.sidebar_width as u16,
                content_y,
                content_height,
            );
        }

        let main = Rect::new(
            metrics.main_panel_start as u16,
            content_y,
            metrics.main_panel_width as u16,
            content_height,
        );
        if state.search.is_active() {
            panes::draw_search_panel(frame, state, main);
        } else {
            panes::draw_file_list(frame, state, main);
        }

        if metrics.show_preview {
            draw_separator(
                frame,
                state,
                (metrics.preview_start - 1) as u16,
                content_y,
                content_height,
            );
            let preview = Rect::new(
                metrics.preview_start as u16,
                content_y,
                metrics.preview_width as u16,
                content_height,
            );
            panes::draw_preview(frame, state, preview, metrics.binary_mode);
        }
    }

    status::draw_status(
        frame,
        state,
        &metrics,
        Rect::new(0, area.height.saturating_sub(2), area.width, 2),
    );

    if state.help_visible {
        help::draw_help(frame, state);
    }
}

/// Binary mode for the full-screen preview, which has the whole width.
fn full_screen_binary_mode(state: &AppState, width: u16) -> layout::BinaryMode {
    let is_binary = state
        .preview_data
        .as_ref()
        .map(|d| d.is_binary())
        .unwrap_or(false);
    if !is_binary {
        layout::BinaryMode::None
    } else if width >= 80 {
        layout::BinaryMode::Full
    } else {
        layout::BinaryMode::HexOnly
    }
}

fn draw_separator(frame: &mut Frame, state: &AppState, x: u16, y: u16, height: u16) {
    let theme = state.config.theme();
    let lines: Vec<Line> = (0..height).map(|_| Line::from("│")).collect();
    frame.render_widget(
        Paragraph::new(Text::from(lines)).style(Style::default().fg(theme.rule)),
        Rect::new(x, y, 1, height),
    );
}

/// Header row: the "rdir" badge plus the breadcrumb, final segment bold,
/// trimmed from the left with `…` when space runs out.
fn draw_header(frame: &mut Frame, state: &AppState, area: Rect) {
    let theme = state.config.theme();
    let badge = " rdir ";
    let path = crate::utils::shorten_home_path(&state.current_path);
    let available = (area.width as usize).saturating_sub(display_width(badge) + 1);

    let mut spans = vec![Span::styled(
        badge,
        Style::default()
            .fg(theme.accent)
            .add_modifier(Modifier::BOLD | Modifier::REVERSED),
    )];
    spans.push(Span::raw(" "));
    spans.extend(breadcrumb_spans(&path, available));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Splits a path into ` › `-separated segment spans, trimming whole
/// segments from the left (replaced by `…`) until the tail fits.
pub fn breadcrumb_spans(path: &str, available: usize) -> Vec<Span<'static>> {
    const SEP: &str = " › ";
    let segments: Vec<String> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .map(|s| sanitize(s))
        .collect();

    if segments.is_empty() {
        return vec![Span::styled(
            "/".to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )];
    }

    let sep_width = display_width(SEP);
    let width_of = |segs: &[String]| -> usize {
        let joined: usize = segs.iter().map(|s| display_width(s)).sum();
        joined + sep_width * segs.len().saturating_sub(1)
    };

    let mut start = 0usize;
    // Keep at least the final segment; "…" plus separator costs 4 cells.
    while start + 1 < segments.len() && width_of(&segments[start..]) + 4 > available {
        start += 1;
    }

    let mut spans: Vec<Span<'static>> = Vec::new();
    if start > 0 {
        spans.push(Span::styled(
            "…".to_string(),
            Style::default().add_modifier(Modifier::DIM),
        ));
        spans.push(Span::raw(SEP));
    }
    let shown = &segments[start..];
    for (i, seg) in shown.iter().enumerate() {
        let last = i + 1 == shown.len();
        let seg = if last && start + 1 == segments.len() && display_width(seg) > available {
            truncate_to_width(seg, available.max(1))
        } else {
            seg.clone()
        };
        spans.push(Span::styled(
            seg,
            if last {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            },
        ));
        if !last {
            spans.push(Span::raw(SEP));
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(spans: &[Span]) -> String {
        spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn breadcrumb_joins_segments() {
        let spans = breadcrumb_spans("~/projects/rdir", 80);
        assert_eq!(text_of(&spans), "~ › projects › rdir");
    }

    #[test]
    fn breadcrumb_trims_from_left() {
        let spans = breadcrumb_spans("/very/long/nested/path/tail", 16);
        let text = text_of(&spans);
        assert!(text.starts_with('…'), "got: {text}");
        assert!(text.ends_with("tail"));
    }

    #[test]
    fn breadcrumb_root_is_slash() {
        let spans = breadcrumb_spans("/", 10);
        assert_eq!(text_of(&spans), "/");
    }
}

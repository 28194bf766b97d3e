//! The two-row status region at the bottom of the browser.
//!
//! Top row: the sanitized absolute path, flashing green briefly after a
//! successful yank. Bottom row: a context-aware key hint plus the
//! index-building summary, replaced by the error text (red) while an error
//! flash is live.

use crate::app::state::AppState;
use crate::core::text::{sanitize, truncate_left_to_width, truncate_to_width};
use crate::ui::layout::LayoutMetrics;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

/// Context-aware help for the bottom row.
fn context_help(state: &AppState) -> &'static str {
    if state.help_visible {
        "Esc close help"
    } else if state.search.is_active() {
        "type to search  ↑↓ select  ⏎ open  Esc back"
    } else if state.filter_active {
        "type to filter  ⏎ apply  Esc clear"
    } else if state.preview_full_screen {
        "↑↓ scroll  w wrap  ←/q back"
    } else {
        "⏎ open  / filter  s search  y yank  e edit  . hidden  q quit  ? help"
    }
}

pub fn draw_status(frame: &mut Frame, state: &AppState, _metrics: &LayoutMetrics, area: Rect) {
    if area.height == 0 {
        return;
    }
    let width = area.width as usize;

    // Path row
    let path = sanitize(&state.current_path.display().to_string());
    let path_style = if state.yank_flash_active() {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    // The tail of the path is the informative part; trim from the left.
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            truncate_left_to_width(&path, width),
            path_style,
        ))),
        Rect::new(area.x, area.y, area.width, 1),
    );

    if area.height < 2 {
        return;
    }

    // Help / error row
    let row = Rect::new(area.x, area.y + 1, area.width, 1);
    if let Some(error) = state.active_error() {
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                truncate_to_width(&sanitize(error), width),
                Style::default().fg(Color::Red),
            ))),
            row,
        );
        return;
    }

    let mut spans = vec![Span::styled(
        context_help(state).to_string(),
        Style::default().add_modifier(Modifier::DIM),
    )];

    if state.search.is_active() && state.search.scanned() > 0 {
        let summary = format!("  ·  indexed {} entries", state.search.scanned());
        spans.push(Span::styled(
            summary,
            Style::default().add_modifier(Modifier::DIM),
        ));
    } else if state.preview_loading
        && let Some(spinner) = state.spinner_frame()
    {
        spans.push(Span::styled(
            format!("  {spinner}"),
            Style::default().add_modifier(Modifier::DIM),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), row);
}

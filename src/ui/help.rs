//! Help overlay for the browser.

use crate::app::state::AppState;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

const ENTRIES: &[(&str, &str)] = &[
    ("↑/k  ↓/j", "move selection"),
    ("PgUp / PgDn", "move one page"),
    ("Home/g  End/G", "jump to first / last"),
    ("⏎ / l", "enter directory, open file in pager"),
    ("→", "enter directory, or full-screen preview"),
    ("←/h/Backspace", "go to parent"),
    ("[ / ]", "history back / forward"),
    ("~", "go home"),
    ("/ or f", "filter the list"),
    ("s", "recursive search"),
    (".", "toggle hidden files"),
    ("r / F5", "reload directory"),
    ("y", "yank path to clipboard"),
    ("e", "open in editor"),
    ("p", "open pager"),
    ("w", "toggle preview wrap"),
    ("Shift+↑/↓", "scroll the preview"),
    ("q", "quit"),
    ("Q", "quit and change shell directory"),
    ("?", "this help"),
];

/// Draws the full-screen key cheatsheet.
pub fn draw_help(frame: &mut Frame, state: &AppState) {
    let _ = state;
    let area = frame.area();
    let height = (ENTRIES.len() as u16 + 4).min(area.height);
    let width = 56.min(area.width);
    let rect = Rect::new(
        (area.width.saturating_sub(width)) / 2,
        (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    let mut lines = vec![Line::from("")];
    for (keys, what) in ENTRIES {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {keys:<18}"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(*what),
        ]));
    }

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(Text::from(lines)).block(
            Block::default().borders(Borders::ALL).title(" rdir keys "),
        ),
        rect,
    );
}

//! Panel layout for rdir.
//!
//! Splits the terminal width into sidebar, main list and preview columns.
//! All decisions are pure functions of the width and the current state so
//! the input mapper can hit-test mouse events against the same metrics the
//! renderer draws with.

use crate::app::state::AppState;
use crate::core::preview::HEX_BYTES_PER_LINE;

/// Sidebar width thresholds: at terminal width `.0` the sidebar gets `.1`.
const SIDEBAR_STEPS: &[(u16, usize)] = &[
    (150, 28),
    (120, 24),
    (100, 20),
    (80, 16),
    (65, 12),
    (52, 10),
];

/// Narrowest useful main panel.
const MIN_MAIN: usize = 32;
/// Narrowest useful text preview.
const MIN_PREVIEW_TEXT: usize = 28;
/// Hex rows without the ASCII margin: offset + 16 hex cells with group gap.
const HEX_ONLY_WIDTH: usize = 60;
/// Full hex rows including the ASCII margin.
const HEX_FULL_WIDTH: usize = 78;
/// Padding added around preview content.
const PREVIEW_PADDING: usize = 2;
/// Text lines sampled when shrinking the preview to its content.
const WIDTH_SAMPLE_LINES: usize = 40;

/// How much of a binary file's hex view fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryMode {
    #[default]
    None,
    HexOnly,
    Full,
}

/// Column layout of one frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutMetrics {
    pub sidebar_width: usize,
    pub side_separator_width: usize,
    pub content_separator_width: usize,
    pub main_panel_start: usize,
    pub main_panel_width: usize,
    pub preview_start: usize,
    pub preview_width: usize,
    pub show_preview: bool,
    pub binary_mode: BinaryMode,
}

fn sidebar_width_for(width: u16) -> usize {
    for (threshold, sidebar) in SIDEBAR_STEPS {
        if width >= *threshold {
            return *sidebar;
        }
    }
    0
}

/// Computes the frame layout from the terminal width and preview content.
pub fn compute(state: &AppState) -> LayoutMetrics {
    let w = state.screen_width as usize;
    let mut metrics = LayoutMetrics::default();

    let search_active = state.search.is_active();
    metrics.sidebar_width = if search_active {
        0
    } else {
        sidebar_width_for(state.screen_width)
    };
    metrics.side_separator_width = usize::from(metrics.sidebar_width > 0);
    metrics.main_panel_start = metrics.sidebar_width + metrics.side_separator_width;

    let content = w.saturating_sub(metrics.main_panel_start);
    metrics.main_panel_width = content;

    if search_active || state.screen_width < 100 {
        return metrics;
    }

    let is_binary = state
        .preview_data
        .as_ref()
        .map(|d| d.is_binary())
        .unwrap_or(false);

    let min_preview = if is_binary {
        HEX_ONLY_WIDTH + PREVIEW_PADDING
    } else {
        MIN_PREVIEW_TEXT
    };
    if content < MIN_MAIN + 1 + min_preview {
        return metrics;
    }

    // Preview gets just under half the content, never dropping below a
    // fifth of it and never starving the list past four fifths.
    let mut preview = (content * 9 / 20).clamp(content / 5, content * 4 / 5);

    if is_binary {
        metrics.binary_mode = binary_mode_for(content.saturating_sub(MIN_MAIN + 1));
        match metrics.binary_mode {
            BinaryMode::None => return metrics,
            BinaryMode::HexOnly => preview = preview.max(HEX_ONLY_WIDTH + PREVIEW_PADDING),
            BinaryMode::Full => preview = preview.max(HEX_FULL_WIDTH + PREVIEW_PADDING),
        }
    } else if let Some(data) = &state.preview_data {
        // Known text may shrink the pane to its measured content.
        let sampled = data
            .text_line_meta
            .iter()
            .take(WIDTH_SAMPLE_LINES)
            .map(|m| m.display_width)
            .max()
            .unwrap_or(0);
        if sampled > 0 {
            preview = preview.min((sampled + PREVIEW_PADDING).max(MIN_PREVIEW_TEXT));
        }
    }

    let preview = preview.min(content.saturating_sub(MIN_MAIN + 1));
    if preview < min_preview {
        return metrics;
    }

    metrics.show_preview = true;
    metrics.content_separator_width = 1;
    metrics.preview_width = preview;
    metrics.main_panel_width = content - preview - 1;
    metrics.preview_start = metrics.main_panel_start + metrics.main_panel_width + 1;
    metrics
}

fn binary_mode_for(available: usize) -> BinaryMode {
    if available >= HEX_FULL_WIDTH + PREVIEW_PADDING {
        BinaryMode::Full
    } else if available >= HEX_ONLY_WIDTH + PREVIEW_PADDING {
        BinaryMode::HexOnly
    } else {
        BinaryMode::None
    }
}

/// Columns a hex row occupies in the given mode.
pub fn hex_row_width(mode: BinaryMode) -> usize {
    match mode {
        BinaryMode::None => 0,
        BinaryMode::HexOnly => HEX_ONLY_WIDTH,
        BinaryMode::Full => HEX_FULL_WIDTH,
    }
}

/// Trims a full hex row down to the hex-only columns (drops the ASCII
/// margin) when the pane cannot fit the full row.
pub fn clip_hex_row(row: &str, mode: BinaryMode) -> &str {
    match mode {
        BinaryMode::Full | BinaryMode::None => row,
        BinaryMode::HexOnly => {
            let cut = row.rfind(" |").unwrap_or(row.len());
            &row[..cut]
        }
    }
}

// Keep the constants honest against the actual renderer output.
const _: () = {
    // offset(8) + 2 + 8*3 + 1 + 8*3 = 59 hex cells, margin adds 2 + 16 + 2
    assert!(HEX_ONLY_WIDTH >= 59);
    assert!(HEX_FULL_WIDTH >= 59 + 2 + HEX_BYTES_PER_LINE + 2 - 1);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidebar_steps() {
        assert_eq!(sidebar_width_for(40), 0);
        assert_eq!(sidebar_width_for(52), 10);
        assert_eq!(sidebar_width_for(64), 10);
        assert_eq!(sidebar_width_for(65), 12);
        assert_eq!(sidebar_width_for(80), 16);
        assert_eq!(sidebar_width_for(100), 20);
        assert_eq!(sidebar_width_for(120), 24);
        assert_eq!(sidebar_width_for(200), 28);
    }

    #[test]
    fn binary_mode_thresholds() {
        assert_eq!(binary_mode_for(50), BinaryMode::None);
        assert_eq!(binary_mode_for(62), BinaryMode::HexOnly);
        assert_eq!(binary_mode_for(80), BinaryMode::Full);
    }

    #[test]
    fn clip_hex_row_drops_margin() {
        let row = crate::core::preview::render_hex_row(0, &[0x41; 16]);
        let clipped = clip_hex_row(&row, BinaryMode::HexOnly);
        assert!(!clipped.contains('|'));
        assert!(clipped.starts_with("00000000"));
    }
}

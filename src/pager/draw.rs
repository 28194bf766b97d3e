//! Row-building primitives for the pager.
//!
//! Rows travel as strings that may carry `ESC [ … m` SGR sequences: the
//! formatted view renders its styled segments to SGR, search highlighting
//! injects reverse-video pairs, and the final conversion to ratatui text
//! happens through `ansi-to-tui` at draw time. Everything here is
//! ANSI-tolerant per the shared primitives in `core::text`.

use crate::core::format::{SegmentStyle, StyledTextSegment};
use crate::core::text::{grapheme_width, is_sgr_start_at, sgr_end_at};
use crate::pager::search::SearchState;

use unicode_segmentation::UnicodeSegmentation;

/// SGR attributes for one segment style class. Kept to the classic 16-color
/// space so any ambient terminal theme shows through.
pub fn sgr_for_style(style: SegmentStyle) -> &'static str {
    match style {
        SegmentStyle::Plain => "",
        SegmentStyle::Strong => "\u{1B}[1m",
        SegmentStyle::Emphasis => "\u{1B}[3m",
        SegmentStyle::Heading => "\u{1B}[1;33m",
        SegmentStyle::Code => "\u{1B}[32m",
        SegmentStyle::CodeBlock => "\u{1B}[32m",
        SegmentStyle::Strike => "\u{1B}[9m",
        SegmentStyle::Link => "\u{1B}[4;36m",
        SegmentStyle::Rule => "\u{1B}[2m",
    }
}

/// Renders one formatted line to an SGR string. Rule rows expand to a
/// full-width `─` run.
pub fn segments_to_sgr(line: &[StyledTextSegment], panel_width: usize) -> String {
    if line.len() == 1 && line[0].style == SegmentStyle::Rule {
        return format!(
            "{}{}\u{1B}[0m",
            sgr_for_style(SegmentStyle::Rule),
            "─".repeat(panel_width.max(1))
        );
    }

    let mut out = String::new();
    for seg in line {
        let sgr = sgr_for_style(seg.style);
        if sgr.is_empty() {
            out.push_str(&seg.text);
        } else {
            out.push_str(sgr);
            out.push_str(&seg.text);
            out.push_str("\u{1B}[0m");
        }
    }
    out
}

/// A highlight span in visible-column coordinates of the current row.
#[derive(Debug, Clone, Copy)]
pub struct HighlightSpan {
    pub start_col: usize,
    pub end_col: usize,
    pub focused: bool,
}

/// Builds the highlight spans for one source line, shifted left by the
/// wrap-skip column count and clipped to the visible column budget.
pub fn visible_spans(
    search: &SearchState,
    line: usize,
    skip_cols: usize,
    max_cols: usize,
) -> Vec<HighlightSpan> {
    let focused = search.focused_hit().copied();
    search
        .hits_on_line(line)
        .filter_map(|hit| {
            let start = hit.start_col.saturating_sub(skip_cols);
            let end = hit.end_col.saturating_sub(skip_cols);
            if end <= start || start >= max_cols || hit.end_col <= skip_cols {
                return None;
            }
            Some(HighlightSpan {
                start_col: start,
                end_col: end.min(max_cols),
                focused: focused
                    .map(|f| f.line == hit.line && f.start_col == hit.start_col)
                    .unwrap_or(false),
            })
        })
        .collect()
}

const HIGHLIGHT_ON: &str = "\u{1B}[7m";
const FOCUS_ON: &str = "\u{1B}[1;7m";
const HIGHLIGHT_OFF: &str = "\u{1B}[27m\u{1B}[22m";

/// Wraps the matched columns of `row` in reverse-video SGR pairs, the
/// focused hit in a bold pair. Ambient SGR sequences pass through
/// untouched and highlighting only toggles reverse/bold, so formatted-view
/// styling survives. Content past `max_cols` is dropped.
pub fn inject_highlights(row: &str, spans: &[HighlightSpan], max_cols: usize) -> String {
    let mut out = String::with_capacity(row.len() + spans.len() * 12);
    let mut col = 0usize;
    let mut active: Option<HighlightSpan> = None;
    let bytes = row.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if is_sgr_start_at(bytes, i) {
            let end = sgr_end_at(bytes, i);
            out.push_str(&row[i..end]);
            i = end;
            continue;
        }
        if col >= max_cols {
            break;
        }

        if let Some(span) = active
            && col >= span.end_col
        {
            out.push_str(HIGHLIGHT_OFF);
            active = None;
        }
        if active.is_none()
            && let Some(span) = spans.iter().find(|s| s.start_col <= col && col < s.end_col)
        {
            out.push_str(if span.focused { FOCUS_ON } else { HIGHLIGHT_ON });
            active = Some(*span);
        }

        let rest = &row[i..];
        let cluster = rest.graphemes(true).next().unwrap_or(rest);
        out.push_str(cluster);
        col += grapheme_width(cluster);
        i += cluster.len();
    }

    if active.is_some() {
        out.push_str(HIGHLIGHT_OFF);
    }
    out
}

/// The search summary shown in the status line: `/<query> <k>/<N>[+]`,
/// or `/<query> !` after a failed execution (e.g. invalid hex).
pub fn search_status(search: &SearchState) -> Option<String> {
    if search.input_active {
        return Some(format!("/{}█", search.input_query()));
    }
    if search.query.is_empty() {
        return None;
    }
    if search.error {
        return Some(format!("/{} !", search.query));
    }
    let suffix = if search.limited { "+" } else { "" };
    if search.hits.is_empty() {
        return Some(format!("/{} 0/0{suffix}", search.query));
    }
    Some(format!(
        "/{} {}/{}{suffix}",
        search.query,
        search.focused + 1,
        search.hits.len()
    ))
}

/// Key cheatsheet shown by the pager's help overlay.
pub fn help_entries() -> &'static [(&'static str, &'static str)] {
    &[
        ("↑/k  ↓/j", "scroll one line"),
        ("Shift+↑/↓", "scroll ten lines"),
        ("PgUp/b  PgDn/Space", "scroll one page"),
        ("Home/g  End/G", "jump to start / end"),
        ("w / →", "toggle wrap (text only)"),
        ("f", "toggle raw / formatted view"),
        ("i", "toggle info line"),
        ("/", "search  (`:` prefix = hex in binary)"),
        ("n / N", "next / previous hit"),
        ("Enter", "page down, or focus hit while searching"),
        ("c / C", "copy visible rows / whole file"),
        ("e", "open in editor"),
        ("? / h", "this help"),
        ("q / x / ← / Esc", "back to the browser"),
        ("Ctrl+C", "quit immediately"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::text::{sgr_aware_width, strip_sgr};
    use crate::pager::search::SearchHit;

    #[test]
    fn highlight_wraps_span_in_reverse_video() {
        let spans = [HighlightSpan {
            start_col: 2,
            end_col: 5,
            focused: false,
        }];
        let out = inject_highlights("abcdefgh", &spans, 80);
        assert_eq!(strip_sgr(&out), "abcdefgh");
        assert!(out.contains("\u{1B}[7mcde"));
        assert!(out.contains("\u{1B}[27m"));
    }

    #[test]
    fn highlight_never_changes_visible_width() {
        let spans = [HighlightSpan {
            start_col: 0,
            end_col: 2,
            focused: true,
        }];
        let out = inject_highlights("日本語", &spans, 80);
        assert_eq!(sgr_aware_width(&out), 6);
    }

    #[test]
    fn highlight_clips_at_max_cols() {
        let out = inject_highlights("abcdefgh", &[], 4);
        assert_eq!(strip_sgr(&out), "abcd");
    }

    #[test]
    fn ambient_sgr_passes_through() {
        let row = "\u{1B}[32mgreen text\u{1B}[0m";
        let spans = [HighlightSpan {
            start_col: 0,
            end_col: 5,
            focused: false,
        }];
        let out = inject_highlights(row, &spans, 80);
        assert!(out.starts_with("\u{1B}[32m"));
        assert_eq!(strip_sgr(&out), "green text");
    }

    #[test]
    fn visible_spans_shift_and_clip() {
        let mut search = SearchState::default();
        search.hits = vec![
            SearchHit { line: 3, start_col: 10, end_col: 14 },
            SearchHit { line: 3, start_col: 0, end_col: 4 },
            SearchHit { line: 4, start_col: 0, end_col: 4 },
        ];
        let spans = visible_spans(&search, 3, 8, 20);
        // the hit ending before the skip is dropped, the other shifts left
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start_col, 2);
        assert_eq!(spans[0].end_col, 6);
    }

    #[test]
    fn rule_rows_expand_to_width() {
        let row = segments_to_sgr(
            &[StyledTextSegment::new("", SegmentStyle::Rule)],
            12,
        );
        assert_eq!(sgr_aware_width(&row), 12);
    }

    #[test]
    fn status_formats() {
        let mut s = SearchState::default();
        assert!(search_status(&s).is_none());
        s.query = "abc".to_string();
        s.hits = vec![SearchHit { line: 0, start_col: 0, end_col: 3 }];
        s.limited = true;
        assert_eq!(search_status(&s).as_deref(), Some("/abc 1/1+"));
        s.error = true;
        assert_eq!(search_status(&s).as_deref(), Some("/abc !"));
    }
}

//! Text measurement and sanitization for rdir.
//!
//! Every string that reaches the terminal goes through this module: display
//! widths are computed per grapheme cluster (not per scalar), tabs are
//! expanded against the running column, and control/formatting runes are
//! replaced before they can corrupt the grid.
//!
//! Width lookups are cached: ASCII in a fixed 128-entry table, everything
//! else in a process-wide read-mostly map.

use once_cell::sync::Lazy;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use std::collections::HashMap;
use std::sync::RwLock;

/// Tab stop used for all inline previews and the pager.
pub const TAB_WIDTH: usize = 4;

static ASCII_WIDTHS: Lazy<[u8; 128]> = Lazy::new(|| {
    let mut table = [0u8; 128];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = match i as u8 {
            0x20..=0x7E => 1,
            _ => 0,
        };
    }
    table
});

static WIDE_CACHE: Lazy<RwLock<HashMap<char, u8>>> =
    Lazy::new(|| RwLock::new(HashMap::with_capacity(256)));

/// Display width of a single scalar in terminal cells.
pub fn char_width(c: char) -> usize {
    if (c as u32) < 128 {
        return ASCII_WIDTHS[c as usize] as usize;
    }

    if let Ok(cache) = WIDE_CACHE.read()
        && let Some(w) = cache.get(&c)
    {
        return *w as usize;
    }

    let w = UnicodeWidthChar::width(c).unwrap_or(0);
    if let Ok(mut cache) = WIDE_CACHE.write() {
        cache.insert(c, w as u8);
    }
    w
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

/// Display width of one grapheme cluster.
///
/// Single-scalar clusters defer to [char_width]. Multi-scalar clusters carry
/// the base scalar's width (combining marks contribute nothing); a
/// regional-indicator pair renders as one two-cell flag.
pub fn grapheme_width(cluster: &str) -> usize {
    let mut chars = cluster.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if chars.next().is_none() {
        return char_width(first);
    }
    if is_regional_indicator(first) {
        return 2;
    }
    char_width(first).max(1)
}

/// Display width of a string, summed per grapheme cluster.
pub fn display_width(s: &str) -> usize {
    if s.is_ascii() {
        return s.bytes().map(|b| ASCII_WIDTHS[b as usize] as usize).sum();
    }
    s.graphemes(true).map(grapheme_width).sum()
}

/// Expands tabs so each `\t` advances the running column to the next
/// multiple of `tab_width`. Wide runes count as two columns.
pub fn expand_tabs(text: &str, tab_width: usize) -> String {
    if !text.contains('\t') {
        return text.to_string();
    }
    let tab_width = tab_width.max(1);

    let mut out = String::with_capacity(text.len() + tab_width);
    let mut col = 0usize;
    for cluster in text.graphemes(true) {
        if cluster == "\t" {
            let pad = tab_width - (col % tab_width);
            for _ in 0..pad {
                out.push(' ');
            }
            col += pad;
        } else {
            out.push_str(cluster);
            col += grapheme_width(cluster);
        }
    }
    out
}

/// Returns the human label for a bidi/zero-width formatting rune, or None
/// for runes that are safe to print.
fn formatting_rune_label(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{00AD}' => "SHY",
        '\u{061C}' => "ALM",
        '\u{180E}' => "MVS",
        '\u{200B}' => "ZWSP",
        '\u{200D}' => "ZWJ",
        '\u{200E}' => "LRM",
        '\u{200F}' => "RLM",
        '\u{2028}' => "LSEP",
        '\u{2029}' => "PSEP",
        '\u{202A}' => "LRE",
        '\u{202B}' => "RLE",
        '\u{202C}' => "PDF",
        '\u{202D}' => "LRO",
        '\u{202E}' => "RLO",
        '\u{2060}' => "WJ",
        '\u{2066}' => "LRI",
        '\u{2067}' => "RLI",
        '\u{2068}' => "FSI",
        '\u{2069}' => "PDI",
        '\u{206A}' => "ISS",
        '\u{206B}' => "ASS",
        '\u{206C}' => "IAFS",
        '\u{206D}' => "AAFS",
        '\u{206E}' => "NADS",
        '\u{206F}' => "NODS",
        '\u{FEFF}' => "BOM",
        _ => return None,
    })
}

fn is_dangerous(c: char) -> bool {
    c == '\n'
        || c == '\r'
        || (c.is_control() && c != '\t')
        || c == '\u{7F}'
        || formatting_rune_label(c).is_some()
}

/// True if the string contains any bidi/zero-width formatting rune.
pub fn has_formatting_runes(s: &str) -> bool {
    s.chars().any(|c| formatting_rune_label(c).is_some())
}

/// Replaces formatting runes with their ⟪label⟫ form, leaving everything
/// else untouched. The bool reports whether anything was replaced.
pub fn replace_formatting_runes(s: &str) -> (String, bool) {
    if !has_formatting_runes(s) {
        return (s.to_string(), false);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match formatting_rune_label(c) {
            Some(label) => {
                out.push('⟪');
                out.push_str(label);
                out.push('⟫');
            }
            None => out.push(c),
        }
    }
    (out, true)
}

/// Scrubs a line for terminal display.
///
/// Formatting runes become visible ⟪label⟫ markers, line breaks become a
/// space, and other C0 controls (plus DEL) become `?`. Tab is considered
/// safe here and expanded elsewhere. Returns the input unchanged when no
/// scrubbing is needed.
pub fn sanitize(s: &str) -> String {
    if !s.chars().any(is_dangerous) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        if let Some(label) = formatting_rune_label(c) {
            out.push('⟪');
            out.push_str(label);
            out.push('⟫');
        } else if c == '\n' || c == '\r' {
            out.push(' ');
        } else if (c.is_control() && c != '\t') || c == '\u{7F}' {
            out.push('?');
        } else {
            out.push(c);
        }
    }
    out
}

// ANSI-tolerant primitives. The formatted view and the pager's search
// highlighting inject `ESC [ … m` SGR pairs; every width or truncation
// computed over such rows must treat those sequences as zero-width.

/// True when byte `i` begins a CSI escape sequence.
pub fn is_sgr_start_at(bytes: &[u8], i: usize) -> bool {
    bytes.get(i) == Some(&0x1B) && bytes.get(i + 1) == Some(&b'[')
}

/// Index one past the end of the CSI sequence starting at `start`.
pub fn sgr_end_at(bytes: &[u8], start: usize) -> usize {
    // start points at ESC. Scan past '[' and parameter bytes to the final
    // letter; unterminated sequences run to the end of the string.
    let mut i = start + 2;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphabetic() {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Display width of a string that may contain SGR escape sequences.
pub fn sgr_aware_width(s: &str) -> usize {
    if !s.contains('\u{1B}') {
        return display_width(s);
    }
    display_width(&strip_sgr(s))
}

/// Removes `ESC [ … m` sequences (and any other CSI sequence) from a string.
/// Unrecognised escapes that are not CSI are preserved verbatim.
pub fn strip_sgr(s: &str) -> String {
    if !s.contains('\u{1B}') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        if is_sgr_start_at(bytes, i) {
            i = sgr_end_at(bytes, i);
            continue;
        }
        let ch_len = next_char_len(bytes, i);
        out.push_str(&s[i..i + ch_len]);
        i += ch_len;
    }
    out
}

fn next_char_len(bytes: &[u8], i: usize) -> usize {
    let b = bytes[i];
    if b < 0x80 {
        1
    } else if b >= 0xF0 {
        4
    } else if b >= 0xE0 {
        3
    } else {
        2
    }
}

/// Drops a prefix of `cols` display columns from a row, skipping SGR
/// sequences without consuming width and carrying them into the output so
/// ambient styling survives the cut. A wide rune straddling the boundary is
/// replaced by a single space.
pub fn trim_wrapped_prefix(s: &str, cols: usize) -> String {
    if cols == 0 {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut remaining = cols;
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() && remaining > 0 {
        if is_sgr_start_at(bytes, i) {
            let end = sgr_end_at(bytes, i);
            out.push_str(&s[i..end]);
            i = end;
            continue;
        }
        // Consume one grapheme cluster worth of width.
        let rest = &s[i..];
        let cluster = rest.graphemes(true).next().unwrap_or(rest);
        let w = grapheme_width(cluster);
        i += cluster.len();
        if w > remaining {
            out.push(' ');
            remaining = 0;
        } else {
            remaining -= w;
        }
    }

    out.push_str(&s[i..]);
    out
}

/// Trims a plain string from the left to at most `max_cols` display
/// columns, prefixing `…` and keeping the tail. Used where the end of the
/// string carries the information (paths).
pub fn truncate_left_to_width(s: &str, max_cols: usize) -> String {
    if display_width(s) <= max_cols {
        return s.to_string();
    }
    if max_cols == 0 {
        return String::new();
    }

    let clusters: Vec<&str> = s.graphemes(true).collect();
    let mut used = 0usize;
    let mut start = clusters.len();
    while start > 0 {
        let w = grapheme_width(clusters[start - 1]);
        if used + w > max_cols.saturating_sub(1) {
            break;
        }
        used += w;
        start -= 1;
    }
    let mut out = String::with_capacity(s.len());
    out.push('…');
    out.extend(clusters[start..].iter().copied());
    out
}

/// Truncates a plain (SGR-free) string to at most `max_cols` display
/// columns, appending `…` when anything was dropped.
pub fn truncate_to_width(s: &str, max_cols: usize) -> String {
    if display_width(s) <= max_cols {
        return s.to_string();
    }
    if max_cols == 0 {
        return String::new();
    }

    let mut out = String::with_capacity(s.len());
    let mut used = 0usize;
    for cluster in s.graphemes(true) {
        let w = grapheme_width(cluster);
        if used + w > max_cols.saturating_sub(1) {
            break;
        }
        out.push_str(cluster);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_width_is_byte_count() {
        assert_eq!(display_width("hello world"), 11);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn wide_runes_count_double() {
        assert_eq!(display_width("日本語"), 6);
        assert_eq!(display_width("a日b"), 4);
    }

    #[test]
    fn combining_marks_do_not_widen() {
        // e + combining acute forms one cluster of width 1
        assert_eq!(display_width("e\u{0301}"), 1);
    }

    #[test]
    fn tab_expansion_reaches_next_stop() {
        assert_eq!(expand_tabs("a\tb", 4), "a   b");
        assert_eq!(expand_tabs("\t", 4), "    ");
        assert_eq!(expand_tabs("ab\tc", 4), "ab  c");
        // wide rune counts two columns before the stop
        assert_eq!(expand_tabs("日\tx", 4), "日  x");
    }

    #[test]
    fn tab_expansion_is_idempotent() {
        let once = expand_tabs("a\tb\tc", 4);
        assert_eq!(expand_tabs(&once, 4), once);
    }

    #[test]
    fn sanitize_fast_path_returns_input() {
        let clean = "just a line";
        assert_eq!(sanitize(clean), clean);
    }

    #[test]
    fn sanitize_replaces_controls_and_breaks() {
        assert_eq!(sanitize("a\nb"), "a b");
        assert_eq!(sanitize("a\rb"), "a b");
        assert_eq!(sanitize("a\u{07}b"), "a?b");
        assert_eq!(sanitize("a\u{7F}b"), "a?b");
        assert_eq!(sanitize("a\tb"), "a\tb");
    }

    #[test]
    fn sanitize_labels_formatting_runes() {
        assert_eq!(sanitize("a\u{200B}b"), "a⟪ZWSP⟫b");
        assert_eq!(sanitize("\u{202E}x"), "⟪RLO⟫x");
        assert!(has_formatting_runes("x\u{FEFF}"));
        assert!(!has_formatting_runes("plain"));
    }

    #[test]
    fn sanitize_is_idempotent() {
        let dirty = "a\u{200B}\n\u{01}b";
        let once = sanitize(dirty);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn replace_formatting_runes_reports_change() {
        let (out, changed) = replace_formatting_runes("a\u{200E}b");
        assert!(changed);
        assert_eq!(out, "a⟪LRM⟫b");
        let (out, changed) = replace_formatting_runes("ab");
        assert!(!changed);
        assert_eq!(out, "ab");
    }

    #[test]
    fn sgr_sequences_are_zero_width() {
        let styled = "\u{1B}[7mhit\u{1B}[27m rest";
        assert_eq!(sgr_aware_width(styled), display_width("hit rest"));
        assert_eq!(strip_sgr(styled), "hit rest");
    }

    #[test]
    fn trim_prefix_preserves_sgr_and_width() {
        let styled = "\u{1B}[1mabcdef\u{1B}[0m";
        let cut = trim_wrapped_prefix(styled, 3);
        assert_eq!(strip_sgr(&cut), "def");
        assert!(cut.starts_with("\u{1B}[1m"));
    }

    #[test]
    fn trim_prefix_splits_wide_rune_to_space() {
        let cut = trim_wrapped_prefix("日本", 1);
        assert_eq!(cut, " 本");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
        assert_eq!(truncate_to_width("ab", 4), "ab");
    }

    #[test]
    fn truncate_left_keeps_tail() {
        assert_eq!(truncate_left_to_width("/a/b/c/d", 5), "…/c/d");
        assert_eq!(truncate_left_to_width("/ab", 5), "/ab");
    }
}

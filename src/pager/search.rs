//! In-pager search.
//!
//! Text sources get literal substring search with smart case, streaming
//! lines in as needed up to a line/hit budget. Binary sources get an
//! exact-byte scan — ASCII literal, or a hex pattern when the query starts
//! with `:` — using chunked reads with an overlap so matches never fall
//! into a seam. Match spans are reported in terminal-column coordinates of
//! the rendered row.

use crate::core::preview::HEX_BYTES_PER_LINE;
use crate::core::text::display_width;
use crate::error::{Error, Result};
use crate::pager::source::{PagerSource, TextSource};

use std::fs::File;
use std::io::Read;
use std::time::{Duration, Instant};

/// Keystroke-to-execution debounce.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(140);
/// Lines examined per execution before the result is marked limited.
pub const SEARCH_MAX_LINES: usize = 20_000;
/// Hits collected before the result is marked limited.
pub const SEARCH_MAX_HITS: usize = 10_000;
/// Bytes per binary scan chunk.
const SCAN_CHUNK: usize = 256 * 1024;

/// One hit: a source line plus a column span in the rendered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

/// Search mode state carried by the pager.
#[derive(Default)]
pub struct SearchState {
    /// True while the user is typing after `/`.
    pub input_active: bool,
    pub input: Vec<char>,
    /// The query whose hits are currently displayed.
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub focused: usize,
    pub limited: bool,
    pub error: bool,
    debounce_until: Option<Instant>,
}

impl SearchState {
    pub fn begin_input(&mut self) {
        self.input_active = true;
        self.input = self.query.chars().collect();
    }

    pub fn cancel_input(&mut self) {
        self.input_active = false;
        self.debounce_until = None;
    }

    pub fn push(&mut self, ch: char) {
        self.input.push(ch);
        self.debounce_until = Some(Instant::now() + SEARCH_DEBOUNCE);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
        self.debounce_until = Some(Instant::now() + SEARCH_DEBOUNCE);
    }

    pub fn input_query(&self) -> String {
        self.input.iter().collect()
    }

    /// True once the debounce window elapsed; clears the marker.
    pub fn take_due(&mut self) -> bool {
        match self.debounce_until {
            Some(until) if Instant::now() >= until => {
                self.debounce_until = None;
                true
            }
            _ => false,
        }
    }

    pub fn next_wakeup(&self) -> Option<Instant> {
        self.debounce_until
    }

    pub fn clear(&mut self) {
        *self = SearchState::default();
    }

    /// Moves the focused hit forward or back, modulo the hit count.
    pub fn advance(&mut self, forward: bool) {
        if self.hits.is_empty() {
            return;
        }
        if forward {
            self.focused = (self.focused + 1) % self.hits.len();
        } else {
            self.focused = (self.focused + self.hits.len() - 1) % self.hits.len();
        }
    }

    pub fn focused_hit(&self) -> Option<&SearchHit> {
        self.hits.get(self.focused)
    }

    /// Focuses the first hit at or after `line` without wrapping; used when
    /// a fresh search should land on the nearest visible hit.
    pub fn focus_at_or_after(&mut self, line: usize) {
        if let Some(pos) = self.hits.iter().position(|h| h.line >= line) {
            self.focused = pos;
        } else {
            self.focused = 0;
        }
    }

    /// Hits on one source line.
    pub fn hits_on_line(&self, line: usize) -> impl Iterator<Item = &SearchHit> {
        self.hits.iter().filter(move |h| h.line == line)
    }
}

/// Result of one execution.
pub struct SearchOutcome {
    pub hits: Vec<SearchHit>,
    pub limited: bool,
}

/// Runs `query` over the source. Text queries use smart case: all-lowercase
/// queries compare case-insensitively, anything else exactly.
pub fn execute_search(source: &mut PagerSource, query: &str) -> Result<SearchOutcome> {
    match source {
        PagerSource::Directory(dir) => {
            let mut hits = Vec::new();
            let insensitive = is_smart_insensitive(query);
            for (idx, row) in dir.rows.iter().enumerate() {
                collect_line_hits(row, query, insensitive, idx, &mut hits);
                if hits.len() >= SEARCH_MAX_HITS {
                    break;
                }
            }
            let limited = hits.len() >= SEARCH_MAX_HITS;
            Ok(SearchOutcome { hits, limited })
        }
        PagerSource::Text(text) => search_text(text, query),
        PagerSource::Binary(binary) => {
            search_binary(&binary.path, binary.total_bytes(), query)
        }
    }
}

fn search_text(source: &mut TextSource, query: &str) -> Result<SearchOutcome> {
    let insensitive = is_smart_insensitive(query);
    let mut hits = Vec::new();
    let mut limited = false;

    let mut idx = 0usize;
    loop {
        if idx >= SEARCH_MAX_LINES {
            limited = true;
            break;
        }
        source.ensure_line(idx)?;
        if idx >= source.line_count() {
            break;
        }
        let line = source.line(idx)?;
        collect_line_hits(&line, query, insensitive, idx, &mut hits);
        if hits.len() >= SEARCH_MAX_HITS {
            hits.truncate(SEARCH_MAX_HITS);
            limited = true;
            break;
        }
        idx += 1;
    }

    if !source.fully_loaded() {
        limited = true;
    }
    Ok(SearchOutcome { hits, limited })
}

/// Smart case: a query with no uppercase rune compares case-insensitively.
fn is_smart_insensitive(query: &str) -> bool {
    !query.chars().any(|c| c.is_uppercase())
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Finds literal matches of `query` in `haystack`, returning byte ranges.
/// Case folding is applied per rune so byte offsets always index the
/// original string.
fn find_matches(haystack: &str, query: &str, insensitive: bool) -> Vec<(usize, usize)> {
    if query.is_empty() {
        return Vec::new();
    }
    let hay: Vec<(usize, char)> = haystack.char_indices().collect();
    let needle: Vec<char> = if insensitive {
        query.chars().map(fold).collect()
    } else {
        query.chars().collect()
    };

    let mut out = Vec::new();
    let mut start = 0usize;
    while start + needle.len() <= hay.len() {
        let matched = needle.iter().enumerate().all(|(j, nc)| {
            let hc = hay[start + j].1;
            let hc = if insensitive { fold(hc) } else { hc };
            hc == *nc
        });
        if matched {
            let byte_start = hay[start].0;
            let end_idx = start + needle.len();
            let byte_end = hay
                .get(end_idx)
                .map(|(b, _)| *b)
                .unwrap_or(haystack.len());
            out.push((byte_start, byte_end));
            start = end_idx;
        } else {
            start += 1;
        }
    }
    out
}

/// Converts byte ranges to display-column spans and appends hits.
fn collect_line_hits(
    line: &str,
    query: &str,
    insensitive: bool,
    idx: usize,
    hits: &mut Vec<SearchHit>,
) {
    for (byte_start, byte_end) in find_matches(line, query, insensitive) {
        let start_col = display_width(&line[..byte_start]);
        let end_col = start_col + display_width(&line[byte_start..byte_end]);
        hits.push(SearchHit {
            line: idx,
            start_col,
            end_col,
        });
    }
}

/// Parses a binary query: `:` prefix means hex bytes (whitespace allowed),
/// anything else is the query's exact ASCII bytes.
fn parse_binary_needle(query: &str) -> std::result::Result<Vec<u8>, ()> {
    if let Some(hex) = query.strip_prefix(':') {
        let compact: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() || compact.len() % 2 != 0 {
            return Err(());
        }
        (0..compact.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&compact[i..i + 2], 16).map_err(|_| ()))
            .collect()
    } else if query.is_ascii() && !query.is_empty() {
        Ok(query.as_bytes().to_vec())
    } else {
        Err(())
    }
}

/// Column span of bytes `[first, last]` within a 16-byte hex row.
fn hex_span(first: usize, last: usize) -> (usize, usize) {
    let col_of = |j: usize| 10 + j * 3 + usize::from(j >= 8);
    (col_of(first), col_of(last) + 2)
}

/// Scans the file for the needle with overlapping chunked reads; the
/// overlap is `needle.len() - 1` so seam-straddling matches are found once.
fn search_binary(
    path: &std::path::Path,
    total_bytes: u64,
    query: &str,
) -> Result<SearchOutcome> {
    let needle = parse_binary_needle(query)
        .map_err(|_| Error::policy(format!("invalid binary query: {query}")))?;

    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut hits = Vec::new();
    let mut limited = false;

    let overlap = needle.len().saturating_sub(1);
    let mut carry: Vec<u8> = Vec::new();
    let mut carry_offset = 0u64;
    let mut read_total = 0u64;

    'scan: loop {
        let mut chunk = vec![0u8; SCAN_CHUNK];
        let n = file.read(&mut chunk).map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        chunk.truncate(n);
        read_total += n as u64;

        let base = carry_offset;
        let mut window = std::mem::take(&mut carry);
        window.extend_from_slice(&chunk);

        let mut pos = 0usize;
        while pos + needle.len() <= window.len() {
            if window[pos..pos + needle.len()] == needle[..] {
                let offset = base + pos as u64;
                let line = (offset as usize) / HEX_BYTES_PER_LINE;
                let first = (offset as usize) % HEX_BYTES_PER_LINE;
                let last = (first + needle.len() - 1).min(HEX_BYTES_PER_LINE - 1);
                let (start_col, end_col) = hex_span(first, last);
                hits.push(SearchHit {
                    line,
                    start_col,
                    end_col,
                });
                if hits.len() >= SEARCH_MAX_HITS {
                    limited = true;
                    break 'scan;
                }
                pos += needle.len();
            } else {
                pos += 1;
            }
        }

        let keep_from = window.len().saturating_sub(overlap);
        carry_offset = base + keep_from as u64;
        carry = window.split_off(keep_from);
    }

    if read_total < total_bytes && !limited {
        limited = true;
    }
    Ok(SearchOutcome { hits, limited })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn smart_case_detection() {
        assert!(is_smart_insensitive("hello"));
        assert!(is_smart_insensitive("123/äö"));
        assert!(!is_smart_insensitive("Hello"));
    }

    #[test]
    fn insensitive_matches_any_haystack_case() {
        let spans_a = find_matches("FooBar foobar FOOBAR", "foobar", true);
        assert_eq!(spans_a.len(), 3);
        let spans_b = find_matches("xyz", "foobar", true);
        assert!(spans_b.is_empty());
    }

    #[test]
    fn sensitive_matches_exactly() {
        let spans = find_matches("FooBar foobar", "FooBar", false);
        assert_eq!(spans, vec![(0, 6)]);
    }

    #[test]
    fn match_columns_account_for_wide_prefix() {
        let mut hits = Vec::new();
        collect_line_hits("日本abc", "abc", true, 0, &mut hits);
        assert_eq!(hits, vec![SearchHit { line: 0, start_col: 4, end_col: 7 }]);
    }

    #[test]
    fn hex_needle_parsing() {
        assert_eq!(parse_binary_needle(":deadbeef"), Ok(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(parse_binary_needle(":de ad"), Ok(vec![0xde, 0xad]));
        assert!(parse_binary_needle(":xyz").is_err());
        assert!(parse_binary_needle(":abc").is_err(), "odd digit count");
        assert_eq!(parse_binary_needle("AB"), Ok(vec![b'A', b'B']));
    }

    #[test]
    fn hex_span_columns() {
        // byte 0 sits right after "xxxxxxxx  "
        assert_eq!(hex_span(0, 0), (10, 12));
        // the group gap shifts bytes 8..16 by one column
        assert_eq!(hex_span(8, 8), (35, 37));
        assert_eq!(hex_span(0, 3), (10, 21));
    }

    #[test]
    fn binary_scan_finds_matches_across_chunks() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("blob.bin");
        // place the needle straddling the chunk seam
        let mut bytes = vec![0u8; SCAN_CHUNK + 64];
        let seam = SCAN_CHUNK - 2;
        bytes[seam..seam + 4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        bytes[10..14].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        fs::write(&path, &bytes).expect("write");

        let outcome =
            search_binary(&path, bytes.len() as u64, ":deadbeef").expect("scan");
        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[0].line, 0);
        let seam_line = seam / HEX_BYTES_PER_LINE;
        assert_eq!(outcome.hits[1].line, seam_line);
    }

    #[test]
    fn invalid_hex_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("b.bin");
        fs::write(&path, [0u8; 4]).expect("write");
        assert!(search_binary(&path, 4, ":zz").is_err());
    }

    #[test]
    fn advance_wraps_modulo() {
        let mut s = SearchState {
            hits: vec![
                SearchHit { line: 0, start_col: 0, end_col: 1 },
                SearchHit { line: 5, start_col: 0, end_col: 1 },
            ],
            ..Default::default()
        };
        s.advance(true);
        assert_eq!(s.focused, 1);
        s.advance(true);
        assert_eq!(s.focused, 0);
        s.advance(false);
        assert_eq!(s.focused, 1);
    }
}

//! Preview construction for rdir.
//!
//! [PreviewData] is the artifact produced for one selected entry: a
//! directory listing, a decoded text head with per-line byte metadata, an
//! optional styled (Markdown/JSON) view, or prerendered hex rows for binary
//! files. The byte metadata is what lets the pager seek back into the file
//! for everything past the head without rereading what is already decoded.

use crate::core::format::{
    self, FormattedKind, StyledLineMeta, StyledTextSegment, formatted_kind_for,
};
use crate::core::fsx::{
    FileEntry, TextEncoding, detect_encoding, is_text_file, load_directory, read_file_head,
};
use crate::core::text::{self, display_width, expand_tabs, has_formatting_runes, sanitize};
use crate::error::Result;

use std::path::Path;
use std::time::SystemTime;

/// Default head sample size.
pub const PREVIEW_HEAD_LIMIT: usize = 256 * 1024;
/// Bytes per rendered hex row.
pub const HEX_BYTES_PER_LINE: usize = 16;
/// Formatted rows produced for the inline pane; the pager reformats wider.
pub const FORMATTED_MAX_LINES: usize = 4096;

/// Byte-accurate location of one decoded text line.
///
/// `offset`/`length` are in the file's on-disk encoding so `read_at` can
/// reproduce the line; `rune_count` and `display_width` are measured on the
/// tab-expanded decoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLineMetadata {
    pub offset: u64,
    pub length: usize,
    pub rune_count: usize,
    pub display_width: usize,
}

/// Prerendered hex head of a binary file.
#[derive(Debug, Clone, Default)]
pub struct BinaryInfo {
    pub lines: Vec<String>,
    pub total_bytes: u64,
}

/// Everything the UI and the pager need to show one selected entry.
#[derive(Debug, Clone, Default)]
pub struct PreviewData {
    // identity
    pub name: String,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub mode: u32,
    pub is_dir: bool,

    // directory view
    pub dir_entries: Vec<FileEntry>,

    // text view
    pub text_lines: Vec<String>,
    pub text_line_meta: Vec<TextLineMetadata>,
    pub text_char_count: usize,
    pub text_encoding: TextEncoding,
    pub truncated: bool,
    pub text_bytes_read: u64,
    pub remainder: Vec<u8>,

    // formatted view
    pub formatted_segments: Vec<Vec<StyledTextSegment>>,
    pub formatted_segment_line_meta: Vec<StyledLineMeta>,
    pub formatted_kind: FormattedKind,
    pub formatted_unavailable_reason: Option<String>,

    // binary view
    pub binary_info: Option<BinaryInfo>,

    // diagnostics
    pub hidden_formatting_detected: bool,
    pub line_count: usize,
}

impl PreviewData {
    pub fn has_text(&self) -> bool {
        !self.text_lines.is_empty() || (!self.is_dir && self.binary_info.is_none())
    }

    pub fn has_formatted(&self) -> bool {
        !self.formatted_segments.is_empty()
    }

    pub fn is_binary(&self) -> bool {
        self.binary_info.is_some()
    }
}

/// One decoded scalar paired with its byte length in the source encoding.
type Unit = (char, usize);

fn decode_units(bytes: &[u8], encoding: TextEncoding) -> Vec<Unit> {
    match encoding {
        TextEncoding::Unknown | TextEncoding::Utf8Bom => decode_utf8_units(bytes),
        TextEncoding::Utf16Le => decode_utf16_units(bytes, true),
        TextEncoding::Utf16Be => decode_utf16_units(bytes, false),
    }
}

fn decode_utf8_units(bytes: &[u8]) -> Vec<Unit> {
    let mut units = Vec::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            units.push((c, c.len_utf8()));
        }
        let invalid = chunk.invalid();
        if !invalid.is_empty() {
            // One replacement rune stands in for the whole invalid run so
            // byte accounting stays exact.
            units.push(('\u{FFFD}', invalid.len()));
        }
    }
    units
}

fn decode_utf16_units(bytes: &[u8], little_endian: bool) -> Vec<Unit> {
    let mut code_units = Vec::with_capacity(bytes.len() / 2);
    let mut chunks = bytes.chunks_exact(2);
    for pair in &mut chunks {
        let unit = if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        };
        code_units.push(unit);
    }

    let mut units = Vec::with_capacity(code_units.len());
    for decoded in char::decode_utf16(code_units.into_iter()) {
        match decoded {
            Ok(c) => units.push((c, c.len_utf16() * 2)),
            Err(_) => units.push(('\u{FFFD}', 2)),
        }
    }
    // A dangling odd byte is represented as a replacement rune only when the
    // caller knows the file ends here; mid-stream it belongs to the next
    // chunk and is split off before decoding.
    if !chunks.remainder().is_empty() {
        units.push(('\u{FFFD}', 1));
    }
    units
}

/// A decoded line plus its byte span in the source encoding.
struct RawLine {
    text: String,
    offset: u64,
    length: usize,
}

/// Splits decoded units into LF-terminated lines, trimming one trailing CR
/// per line. Returns the lines and the byte offset just past the last
/// terminator (where any unterminated tail starts).
fn split_lines(units: &[Unit], start_offset: u64) -> (Vec<RawLine>, u64, String, usize) {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_bytes = 0usize;
    let mut line_start = start_offset;
    let mut offset = start_offset;

    for (c, len) in units {
        if *c == '\n' {
            let mut length = current_bytes;
            if current.ends_with('\r') {
                current.pop();
                length -= cr_len(*len);
            }
            lines.push(RawLine {
                text: std::mem::take(&mut current),
                offset: line_start,
                length,
            });
            current_bytes = 0;
            offset += *len as u64;
            line_start = offset;
        } else {
            current.push(*c);
            current_bytes += len;
            offset += *len as u64;
        }
    }

    (lines, line_start, current, current_bytes)
}

// The CR that precedes an LF has the LF's unit width in every encoding we
// decode (1 byte in UTF-8, 2 in UTF-16).
fn cr_len(lf_len: usize) -> usize {
    lf_len
}

/// Renders one hex row: 8-digit offset, two 8-byte groups with a gap, and
/// the printable-ASCII margin. Short rows pad the hex area to keep the
/// margin aligned.
pub fn render_hex_row(offset: u64, bytes: &[u8]) -> String {
    let mut out = String::with_capacity(80);
    out.push_str(&format!("{offset:08x}  "));

    for i in 0..HEX_BYTES_PER_LINE {
        if i == 8 {
            out.push(' ');
        }
        match bytes.get(i) {
            Some(b) => out.push_str(&format!("{b:02x} ")),
            None => out.push_str("   "),
        }
    }

    out.push_str(" |");
    for b in bytes {
        out.push(if (0x20..0x7F).contains(b) {
            *b as char
        } else {
            '.'
        });
    }
    for _ in bytes.len()..HEX_BYTES_PER_LINE {
        out.push(' ');
    }
    out.push('|');
    out
}

/// Renders a byte buffer as hex rows starting at file offset zero.
pub fn render_hex_head(head: &[u8]) -> Vec<String> {
    head.chunks(HEX_BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| render_hex_row((i * HEX_BYTES_PER_LINE) as u64, chunk))
        .collect()
}

/// Builds the preview for one entry per the pipeline in the module docs.
///
/// `byte_limit` bounds the head sample; `formatted_width` is the column
/// budget used when reflowing the styled view.
pub fn build_preview(
    entry: &FileEntry,
    byte_limit: usize,
    formatted_width: usize,
) -> Result<PreviewData> {
    let mut data = PreviewData {
        name: entry.name_str().to_string(),
        size: entry.size(),
        modified: entry.modified(),
        mode: entry.mode(),
        is_dir: entry.is_dir(),
        ..PreviewData::default()
    };

    if entry.is_dir() {
        data.dir_entries = load_directory(entry.path())?;
        data.line_count = data.dir_entries.len();
        return Ok(data);
    }

    let head = read_file_head(entry.path(), byte_limit)?;
    let encoding = detect_encoding(&head);

    if !is_text_file(entry.path(), &head) {
        data.binary_info = Some(BinaryInfo {
            lines: render_hex_head(&head),
            total_bytes: entry.size(),
        });
        data.line_count =
            (entry.size() as usize).div_ceil(HEX_BYTES_PER_LINE);
        return Ok(data);
    }

    data.text_encoding = encoding;
    build_text_preview(&mut data, entry.path(), &head, entry.size(), formatted_width);
    Ok(data)
}

fn build_text_preview(
    data: &mut PreviewData,
    path: &Path,
    head: &[u8],
    file_size: u64,
    formatted_width: usize,
) {
    let encoding = data.text_encoding;
    let bom = encoding.bom_len().min(head.len());
    let fully_read = head.len() as u64 >= file_size;
    data.text_bytes_read = head.len() as u64;

    // Empty file: a single empty line, fully represented.
    if head.is_empty() {
        data.text_lines.push(String::new());
        data.text_line_meta.push(TextLineMetadata {
            offset: 0,
            length: 0,
            rune_count: 0,
            display_width: 0,
        });
        data.line_count = 1;
        return;
    }

    let body = &head[bom..];

    // Mid-stream UTF-16 may end on an odd byte; keep it out of the decode.
    // The remainder slice below picks it up again.
    let decode_slice = if encoding.is_utf16() && !fully_read && body.len() % 2 == 1 {
        &body[..body.len() - 1]
    } else {
        body
    };

    let units = decode_units(decode_slice, encoding);
    let (raw_lines, tail_offset, tail_text, tail_bytes) = split_lines(&units, bom as u64);

    let mut decoded_lines: Vec<String> = raw_lines.iter().map(|l| l.text.clone()).collect();
    let mut metas: Vec<TextLineMetadata> = raw_lines
        .iter()
        .map(|l| TextLineMetadata {
            offset: l.offset,
            length: l.length,
            rune_count: 0,
            display_width: 0,
        })
        .collect();

    if fully_read {
        // The unterminated tail is a complete final line; a file that is
        // nothing but a BOM stays an empty view.
        if !tail_text.is_empty() {
            decoded_lines.push(tail_text);
            metas.push(TextLineMetadata {
                offset: tail_offset,
                length: tail_bytes,
                rune_count: 0,
                display_width: 0,
            });
        }
        data.truncated = false;
    } else {
        data.remainder = head[tail_offset as usize..].to_vec();
        data.truncated = true;
    }

    // Measure and scrub each line.
    let mut char_count = 0usize;
    let mut hidden = false;
    let mut display_lines = Vec::with_capacity(decoded_lines.len());
    for (line, meta) in decoded_lines.iter().zip(metas.iter_mut()) {
        let expanded = expand_tabs(line, text::TAB_WIDTH);
        meta.rune_count = expanded.chars().count();
        meta.display_width = display_width(&expanded);
        char_count += meta.rune_count;
        hidden |= has_formatting_runes(&expanded);
        display_lines.push(sanitize(&expanded));
    }

    data.text_char_count = char_count;
    data.hidden_formatting_detected = hidden;
    data.line_count = display_lines.len();
    data.text_lines = display_lines;
    data.text_line_meta = metas;

    build_formatted_view(data, path, &decoded_lines, formatted_width);
}

fn build_formatted_view(
    data: &mut PreviewData,
    path: &Path,
    decoded_lines: &[String],
    formatted_width: usize,
) {
    data.formatted_kind = formatted_kind_for(path);
    match data.formatted_kind {
        FormattedKind::None => {}
        FormattedKind::Markdown => {
            let (segments, meta) =
                format::format_markdown(decoded_lines, formatted_width, FORMATTED_MAX_LINES, true);
            data.formatted_segments = segments;
            data.formatted_segment_line_meta = meta;
        }
        FormattedKind::Json => {
            if data.truncated {
                data.formatted_unavailable_reason =
                    Some("file larger than the preview sample".to_string());
                return;
            }
            let joined = decoded_lines.join("\n");
            match format::format_json(&joined, formatted_width, FORMATTED_MAX_LINES, true) {
                Ok((segments, meta)) => {
                    data.formatted_segments = segments;
                    data.formatted_segment_line_meta = meta;
                }
                Err(reason) => data.formatted_unavailable_reason = Some(reason),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn entry_for(path: &Path) -> FileEntry {
        FileEntry::from_path(path).expect("entry")
    }

    #[test]
    fn empty_file_is_one_empty_line() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"").expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        assert_eq!(data.text_lines, vec![String::new()]);
        assert!(!data.truncated);
        assert!(data.remainder.is_empty());
        assert_eq!(data.text_char_count, 0);
    }

    #[test]
    fn bom_only_file_is_empty_view() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bom.txt");
        fs::write(&path, [0xEF, 0xBB, 0xBF]).expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        assert_eq!(data.text_encoding, TextEncoding::Utf8Bom);
        assert!(data.text_lines.is_empty(), "BOM-only file keeps no lines");
        assert!(!data.truncated);
    }

    #[test]
    fn metadata_matches_lines_and_char_count() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("lines.txt");
        fs::write(&path, "hello world\nsecond\tline\nlast").expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        assert_eq!(data.text_lines.len(), data.text_line_meta.len());
        assert_eq!(data.text_lines.len(), 3);
        assert!(!data.truncated);

        let sum: usize = data.text_line_meta.iter().map(|m| m.rune_count).sum();
        assert_eq!(sum, data.text_char_count);
        for meta in &data.text_line_meta {
            assert!(meta.offset + meta.length as u64 <= data.text_bytes_read);
        }
        // raw byte span of line 1 reproduces it
        let m = &data.text_line_meta[1];
        let raw = fs::read(&path).expect("read");
        let span = &raw[m.offset as usize..m.offset as usize + m.length];
        assert_eq!(span, b"second\tline");
    }

    #[test]
    fn crlf_lines_are_trimmed() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("crlf.txt");
        fs::write(&path, "one\r\ntwo\r\n").expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        assert_eq!(data.text_lines, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(data.text_line_meta[0].length, 3);
        assert_eq!(data.text_line_meta[1].offset, 5);
    }

    #[test]
    fn truncated_head_carries_remainder() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("big.txt");
        let mut f = fs::File::create(&path).expect("create");
        for i in 0..100 {
            writeln!(f, "line-{i:03}").expect("write");
        }
        f.write_all(b"unterminated tail").expect("write");
        drop(f);

        let data = build_preview(&entry_for(&path), 64, 80).expect("preview");
        assert!(data.truncated);
        assert!(!data.remainder.is_empty());
        assert_eq!(data.text_bytes_read, 64);
        let consumed: u64 = data
            .text_line_meta
            .last()
            .map(|m| m.offset + m.length as u64)
            .unwrap_or(0);
        assert!(consumed <= data.text_bytes_read);
    }

    #[test]
    fn utf16le_head_decodes_with_byte_offsets() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("wide.txt");
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "first line\r\nsecond line\r\nthird".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(&path, &bytes).expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        assert_eq!(data.text_encoding, TextEncoding::Utf16Le);
        assert_eq!(
            data.text_lines,
            vec!["first line", "second line", "third"]
        );
        // offsets are valid seeks into the original file
        let m = &data.text_line_meta[1];
        let span = &bytes[m.offset as usize..m.offset as usize + m.length];
        let decoded: String = char::decode_utf16(
            span.chunks_exact(2).map(|p| u16::from_le_bytes([p[0], p[1]])),
        )
        .map(|r| r.unwrap_or('\u{FFFD}'))
        .collect();
        assert_eq!(decoded, "second line");
    }

    #[test]
    fn binary_file_renders_hex_rows() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("blob.bin");
        let mut bytes = vec![0u8; 40];
        bytes[0] = 0x41;
        fs::write(&path, &bytes).expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        let info = data.binary_info.as_ref().expect("binary info");
        assert_eq!(info.total_bytes, 40);
        assert_eq!(info.lines.len(), 3);
        assert!(info.lines[0].starts_with("00000000  41 00"));
        assert!(info.lines[0].contains("|A"));
        assert!(info.lines[2].starts_with("00000020"));
    }

    #[test]
    fn hex_row_layout() {
        let row = render_hex_row(0x10000, &[0xde, 0xad, 0xbe, 0xef]);
        assert!(row.starts_with("00010000  de ad be ef"));
        assert!(row.ends_with('|'));
        // short rows keep the margin aligned with full rows
        let full = render_hex_row(0, &[0u8; 16]);
        assert_eq!(row.find('|'), full.find('|'));
    }

    #[test]
    fn directory_preview_lists_children() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("sub")).expect("mkdir");
        fs::write(dir.path().join("a.txt"), "x").expect("write");

        let data = build_preview(&entry_for(dir.path()), 4096, 80).expect("preview");
        assert!(data.is_dir);
        assert_eq!(data.dir_entries.len(), 2);
        assert!(data.dir_entries[0].is_dir(), "directories sort first");
        assert!(data.text_lines.is_empty());
        assert!(data.binary_info.is_none());
    }

    #[test]
    fn markdown_preview_gets_formatted_view() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("doc.md");
        fs::write(&path, "# Title\n\nbody text\n").expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        assert_eq!(data.formatted_kind, FormattedKind::Markdown);
        assert!(data.has_formatted());
        assert_eq!(
            data.formatted_segments.len(),
            data.formatted_segment_line_meta.len()
        );
    }

    #[test]
    fn invalid_json_records_reason() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"unclosed\": ").expect("write");

        let data = build_preview(&entry_for(&path), 4096, 80).expect("preview");
        assert_eq!(data.formatted_kind, FormattedKind::Json);
        assert!(!data.has_formatted());
        assert!(data.formatted_unavailable_reason.is_some());
    }
}

//! Pager content sources.
//!
//! The pager reads from one of three sources resolved at open time: the
//! prerendered directory rows, a streaming text reader seeded from the
//! preview head, or a chunked binary reader. Streaming never loads the
//! whole file unless an operation (scroll-to-end, copy-all, deep search)
//! explicitly asks for it.

use crate::core::fsx::{FileEntry, TextEncoding};
use crate::core::preview::{HEX_BYTES_PER_LINE, PreviewData, render_hex_row};
use crate::core::text::{TAB_WIDTH, display_width, expand_tabs, sanitize};
use crate::error::{Error, Result};

use lru::LruCache;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Bytes read per streaming text chunk.
const TEXT_CHUNK_SIZE: usize = 128 * 1024;
/// Decoded lines kept in the text cache.
const TEXT_CACHE_LINES: usize = 512;
/// Bytes per binary chunk.
const BINARY_CHUNK_SIZE: usize = 64 * 1024;
/// Binary chunks kept in memory.
const BINARY_CACHE_CHUNKS: usize = 8;

/// Byte-accurate record of one streamed line; mirrors the preview's
/// per-line metadata.
#[derive(Debug, Clone, Copy)]
pub struct TextLineRecord {
    pub offset: u64,
    pub length: usize,
    pub rune_count: usize,
    pub display_width: usize,
}

/// What the pager pages over.
pub enum PagerSource {
    Directory(DirectorySource),
    Text(TextSource),
    Binary(BinarySource),
}

impl PagerSource {
    /// Resolves the source for the previewed entry.
    pub fn open(path: &Path, preview: &PreviewData) -> PagerSource {
        if preview.is_dir {
            PagerSource::Directory(DirectorySource::new(&preview.dir_entries))
        } else if let Some(info) = &preview.binary_info {
            PagerSource::Binary(BinarySource::new(path.to_path_buf(), info.total_bytes))
        } else {
            PagerSource::Text(TextSource::from_preview(path.to_path_buf(), preview))
        }
    }

    pub fn line_count(&self) -> usize {
        match self {
            PagerSource::Directory(d) => d.rows.len(),
            PagerSource::Text(t) => t.line_count(),
            PagerSource::Binary(b) => b.line_count(),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, PagerSource::Binary(_))
    }

    /// Drops any open file handle (editor hand-off closes sources).
    pub fn close(&mut self) {
        match self {
            PagerSource::Directory(_) => {}
            PagerSource::Text(t) => t.file = None,
            PagerSource::Binary(b) => b.file = None,
        }
    }
}

/// Prerendered rows for a directory listing.
pub struct DirectorySource {
    pub rows: Vec<String>,
}

impl DirectorySource {
    pub fn new(entries: &[FileEntry]) -> Self {
        let rows = entries
            .iter()
            .map(|e| {
                let marker = if e.is_dir() {
                    "/"
                } else if e.is_symlink() {
                    "@"
                } else {
                    " "
                };
                let size = if e.is_dir() {
                    "-".to_string()
                } else {
                    humansize::format_size(e.size(), humansize::BINARY)
                };
                let modified = e
                    .modified()
                    .map(|m| {
                        let dt: chrono::DateTime<chrono::Local> = m.into();
                        dt.format("%Y-%m-%d %H:%M").to_string()
                    })
                    .unwrap_or_else(|| "-".to_string());
                sanitize(&format!(
                    "{marker} {:<40} {size:>10}  {modified}",
                    e.name_str()
                ))
            })
            .collect();
        Self { rows }
    }

    pub fn row(&self, idx: usize) -> Option<&str> {
        self.rows.get(idx).map(String::as_str)
    }
}

/// Streaming text source.
///
/// Seeded with the preview head: its lines fill the cache, their metadata
/// seeds the record vector, and reading continues at `next_offset`. When
/// the head already covered the file, the source starts fully loaded.
pub struct TextSource {
    pub path: PathBuf,
    encoding: TextEncoding,
    chunk_size: usize,
    file: Option<File>,
    lines: Vec<TextLineRecord>,
    cache: LruCache<usize, String>,
    partial_line: Vec<u8>,
    /// File offset where `partial_line` starts.
    partial_offset: u64,
    next_offset: u64,
    eof: bool,
    char_count: usize,
}

impl TextSource {
    pub fn from_preview(path: PathBuf, preview: &PreviewData) -> Self {
        let mut cache = LruCache::new(NonZeroUsize::new(TEXT_CACHE_LINES).expect("nonzero"));
        let mut lines = Vec::with_capacity(preview.text_line_meta.len());

        for (idx, (line, meta)) in preview
            .text_lines
            .iter()
            .zip(preview.text_line_meta.iter())
            .enumerate()
        {
            lines.push(TextLineRecord {
                offset: meta.offset,
                length: meta.length,
                rune_count: meta.rune_count,
                display_width: meta.display_width,
            });
            cache.put(idx, line.clone());
        }

        let next_offset = preview.text_bytes_read;
        Self {
            path,
            encoding: preview.text_encoding,
            chunk_size: TEXT_CHUNK_SIZE,
            file: None,
            lines,
            cache,
            partial_offset: next_offset - preview.remainder.len() as u64,
            partial_line: preview.remainder.clone(),
            next_offset,
            eof: !preview.truncated,
            char_count: preview.text_char_count,
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn records(&self) -> &[TextLineRecord] {
        &self.lines
    }

    pub fn fully_loaded(&self) -> bool {
        self.eof && self.partial_line.is_empty()
    }

    fn file(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            self.file = Some(File::open(&self.path).map_err(|e| Error::io(&self.path, e))?);
        }
        Ok(self.file.as_mut().expect("just opened"))
    }

    /// Streams chunks until line `idx` exists or the file is exhausted.
    /// Idempotent: already-loaded lines are never re-read.
    pub fn ensure_line(&mut self, idx: usize) -> Result<()> {
        while self.lines.len() <= idx && !self.fully_loaded() {
            self.read_chunk()?;
        }
        Ok(())
    }

    /// Loads every remaining line.
    pub fn ensure_all(&mut self) -> Result<()> {
        while !self.fully_loaded() {
            self.read_chunk()?;
        }
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<()> {
        if self.eof {
            self.flush_partial_as_final_line();
            return Ok(());
        }

        let chunk_size = self.chunk_size;
        let next_offset = self.next_offset;
        let path = self.path.clone();
        let file = self.file()?;
        file.seek(SeekFrom::Start(next_offset))
            .map_err(|e| Error::io(&path, e))?;
        let mut buf = vec![0u8; chunk_size];
        let n = file.read(&mut buf).map_err(|e| Error::io(&path, e))?;
        buf.truncate(n);

        if n == 0 {
            self.eof = true;
            self.flush_partial_as_final_line();
            return Ok(());
        }
        self.next_offset += n as u64;

        self.partial_line.extend_from_slice(&buf);
        self.split_partial();
        Ok(())
    }

    /// Splits complete lines out of `partial_line`, leaving any
    /// unterminated tail (and, for UTF-16, a dangling odd byte) behind.
    fn split_partial(&mut self) {
        let unit = if self.encoding.is_utf16() { 2 } else { 1 };
        let data = std::mem::take(&mut self.partial_line);
        let usable = data.len() - data.len() % unit;

        let mut line_start = 0usize;
        let mut i = 0usize;
        while i + unit <= usable {
            if self.is_lf(&data[i..i + unit]) {
                let mut line_end = i;
                // trim one trailing CR
                if line_end >= unit && self.is_cr(&data[line_end - unit..line_end]) {
                    line_end -= unit;
                }
                let offset = self.partial_offset + line_start as u64;
                self.push_line(&data[line_start..line_end], offset, line_end - line_start);
                line_start = i + unit;
            }
            i += unit;
        }

        self.partial_offset += line_start as u64;
        self.partial_line = data[line_start..].to_vec();
    }

    fn is_lf(&self, unit: &[u8]) -> bool {
        match self.encoding {
            TextEncoding::Utf16Le => unit == [0x0A, 0x00],
            TextEncoding::Utf16Be => unit == [0x00, 0x0A],
            _ => unit[0] == b'\n',
        }
    }

    fn is_cr(&self, unit: &[u8]) -> bool {
        match self.encoding {
            TextEncoding::Utf16Le => unit == [0x0D, 0x00],
            TextEncoding::Utf16Be => unit == [0x00, 0x0D],
            _ => unit[0] == b'\r',
        }
    }

    fn flush_partial_as_final_line(&mut self) {
        if self.partial_line.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.partial_line);
        let offset = self.partial_offset;
        self.partial_offset += data.len() as u64;
        let len = data.len();
        self.push_line(&data, offset, len);
    }

    fn push_line(&mut self, raw: &[u8], offset: u64, length: usize) {
        let decoded = self.decode(raw);
        let expanded = expand_tabs(&decoded, TAB_WIDTH);
        let rune_count = expanded.chars().count();
        let width = display_width(&expanded);

        let idx = self.lines.len();
        self.lines.push(TextLineRecord {
            offset,
            length,
            rune_count,
            display_width: width,
        });
        self.char_count += rune_count;
        self.cache.put(idx, sanitize(&expanded));
    }

    fn decode(&self, raw: &[u8]) -> String {
        match self.encoding {
            TextEncoding::Unknown | TextEncoding::Utf8Bom => {
                String::from_utf8_lossy(raw).into_owned()
            }
            TextEncoding::Utf16Le => decode_utf16(raw, true),
            TextEncoding::Utf16Be => decode_utf16(raw, false),
        }
    }

    /// Returns line `idx`, re-reading evicted lines by their byte span.
    pub fn line(&mut self, idx: usize) -> Result<String> {
        self.ensure_line(idx)?;
        if let Some(cached) = self.cache.get(&idx) {
            return Ok(cached.clone());
        }
        let Some(record) = self.lines.get(idx).copied() else {
            return Ok(String::new());
        };
        let raw = self.read_at(record.offset, record.length)?;
        let decoded = self.decode(&raw);
        let rendered = sanitize(&expand_tabs(&decoded, TAB_WIDTH));
        self.cache.put(idx, rendered.clone());
        Ok(rendered)
    }

    /// Display width of line `idx`; zero when not yet streamed.
    pub fn line_width(&self, idx: usize) -> usize {
        self.lines.get(idx).map(|r| r.display_width).unwrap_or(0)
    }

    /// Writes everything streamed so far back into the preview so the
    /// inline pane reflects what the pager showed. No-op when nothing was
    /// read past the seeded head.
    pub fn persist_loaded_lines(&mut self, data: &mut PreviewData) -> Result<()> {
        if self.next_offset == data.text_bytes_read
            && self.lines.len() == data.text_lines.len()
        {
            return Ok(());
        }

        let count = self.lines.len();
        let mut lines = Vec::with_capacity(count);
        for idx in 0..count {
            lines.push(self.line(idx)?);
        }

        data.text_line_meta = self
            .lines
            .iter()
            .map(|r| crate::core::preview::TextLineMetadata {
                offset: r.offset,
                length: r.length,
                rune_count: r.rune_count,
                display_width: r.display_width,
            })
            .collect();
        data.text_lines = lines;
        data.text_char_count = self.char_count;
        data.text_bytes_read = self.next_offset;
        data.remainder = self.partial_line.clone();
        data.truncated = !self.fully_loaded();
        data.line_count = count;
        data.text_encoding = self.encoding;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let path = self.path.clone();
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(&path, e))?;
        let mut buf = vec![0u8; length];
        file.read_exact(&mut buf).map_err(|e| Error::io(&path, e))?;
        Ok(buf)
    }
}

fn decode_utf16(raw: &[u8], little_endian: bool) -> String {
    let units = raw.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units)
        .map(|r| r.unwrap_or('\u{FFFD}'))
        .collect()
}

/// Chunked binary source: renders 16-byte hex rows on demand, keeping the
/// last few chunks' rendered rows around.
pub struct BinarySource {
    pub path: PathBuf,
    total_bytes: u64,
    chunk_size: usize,
    file: Option<File>,
    cache: LruCache<usize, Vec<String>>,
}

impl BinarySource {
    pub fn new(path: PathBuf, total_bytes: u64) -> Self {
        Self {
            path,
            total_bytes,
            chunk_size: BINARY_CHUNK_SIZE,
            file: None,
            cache: LruCache::new(NonZeroUsize::new(BINARY_CACHE_CHUNKS).expect("nonzero")),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn line_count(&self) -> usize {
        (self.total_bytes as usize).div_ceil(HEX_BYTES_PER_LINE)
    }

    fn lines_per_chunk(&self) -> usize {
        self.chunk_size / HEX_BYTES_PER_LINE
    }

    fn file(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            self.file = Some(File::open(&self.path).map_err(|e| Error::io(&self.path, e))?);
        }
        Ok(self.file.as_mut().expect("just opened"))
    }

    /// Returns hex row `idx`, loading and rendering its chunk on a miss.
    pub fn line(&mut self, idx: usize) -> Result<String> {
        if idx >= self.line_count() {
            return Ok(String::new());
        }
        let chunk_idx = idx / self.lines_per_chunk();
        let row_in_chunk = idx % self.lines_per_chunk();

        if let Some(rows) = self.cache.get(&chunk_idx) {
            return Ok(rows.get(row_in_chunk).cloned().unwrap_or_default());
        }

        let rows = self.render_chunk(chunk_idx)?;
        let row = rows.get(row_in_chunk).cloned().unwrap_or_default();
        self.cache.put(chunk_idx, rows);
        Ok(row)
    }

    fn render_chunk(&mut self, chunk_idx: usize) -> Result<Vec<String>> {
        let chunk_size = self.chunk_size;
        let start = (chunk_idx * chunk_size) as u64;
        let path = self.path.clone();
        let file = self.file()?;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| Error::io(&path, e))?;
        let mut buf = vec![0u8; chunk_size];
        let mut filled = 0usize;
        while filled < buf.len() {
            let n = file
                .read(&mut buf[filled..])
                .map_err(|e| Error::io(&path, e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);

        Ok(buf
            .chunks(HEX_BYTES_PER_LINE)
            .enumerate()
            .map(|(i, row)| render_hex_row(start + (i * HEX_BYTES_PER_LINE) as u64, row))
            .collect())
    }
}

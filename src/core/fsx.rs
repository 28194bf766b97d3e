//! Filesystem probes for rdir.
//!
//! Provides the [FileEntry] struct used throughout rdir, directory listing
//! with the canonical ordering, and the small head-of-file probes the
//! preview builder relies on: head sampling, binary sniffing and Unicode
//! encoding detection.

use crate::error::{Error, Result};

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Bytes inspected for NUL when classifying text vs binary.
const BINARY_PEEK_BYTES: usize = 512;
/// Size of the sample handed to the classifier.
const TEXT_SAMPLE_BYTES: usize = 4096;

/// Extensions that are always treated as binary, regardless of content.
#[rustfmt::skip]
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "webp", "ico", "tiff",
    "mp3", "mp4", "mkv", "avi", "mov", "flac", "ogg", "wav",
    "zip", "tar", "gz", "bz2", "xz", "zst", "7z", "rar",
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "exe", "dll", "so", "dylib", "a", "o", "bin", "class",
    "wasm", "sqlite", "db", "iso", "img", "ttf", "otf", "woff", "woff2",
];

/// Text encoding of a file head, detected by BOM or NUL pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// No BOM seen; decoded as UTF-8.
    #[default]
    Unknown,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Unknown => "utf-8",
            TextEncoding::Utf8Bom => "utf-8 bom",
            TextEncoding::Utf16Le => "utf-16 le",
            TextEncoding::Utf16Be => "utf-16 be",
        }
    }

    /// Byte length of the BOM this encoding carries at offset zero.
    pub fn bom_len(&self) -> usize {
        match self {
            TextEncoding::Unknown => 0,
            TextEncoding::Utf8Bom => 3,
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => 2,
        }
    }

    pub fn is_utf16(&self) -> bool {
        matches!(self, TextEncoding::Utf16Le | TextEncoding::Utf16Be)
    }
}

/// A single entry in a directory listing.
#[derive(Debug, Clone)]
pub struct FileEntry {
    name: OsString,
    name_str: String,
    lowercase_name: String,
    path: PathBuf,
    is_dir: bool,
    is_symlink: bool,
    symlink_target: Option<PathBuf>,
    size: u64,
    modified: Option<SystemTime>,
    mode: u32,
    is_hidden: bool,
}

impl FileEntry {
    /// Builds an entry from a path by probing its metadata. Used for entries
    /// reached outside a directory scan (CLI argument, search results).
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| path.as_os_str().to_os_string());
        let meta = fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;
        let is_symlink = meta.file_type().is_symlink();
        let (target, resolved) = if is_symlink {
            let target = fs::read_link(path).ok();
            let resolved = fs::metadata(path).ok();
            (target, resolved)
        } else {
            (None, None)
        };
        let effective = resolved.as_ref().unwrap_or(&meta);
        let name_lossy = name.to_string_lossy();

        Ok(FileEntry {
            name_str: name_lossy.to_string(),
            lowercase_name: name_lossy.to_lowercase(),
            is_hidden: is_hidden(path, &name_lossy),
            name,
            path: path.to_path_buf(),
            is_dir: effective.is_dir(),
            is_symlink,
            symlink_target: target,
            size: effective.len(),
            modified: effective.modified().ok(),
            mode: mode_bits(effective),
        })
    }

    // Getters / accessors

    pub fn name(&self) -> &OsString {
        &self.name
    }

    pub fn name_str(&self) -> &str {
        &self.name_str
    }

    pub fn lowercase_name(&self) -> &str {
        &self.lowercase_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    pub fn symlink_target(&self) -> Option<&Path> {
        self.symlink_target.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name_str)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
    }
}

fn mode_bits(meta: &fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode()
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        meta.file_attributes()
    }
}

/// Hidden predicate: a leading `.` on POSIX, the hidden attribute on
/// Windows (plus the dot convention, which Windows tools increasingly use).
pub fn is_hidden(path: &Path, name: &str) -> bool {
    #[cfg(unix)]
    {
        let _ = path;
        name.starts_with('.')
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        let by_attr = fs::symlink_metadata(path)
            .map(|md| md.file_attributes() & 0x2 != 0)
            .unwrap_or(false);
        by_attr || name.starts_with('.')
    }
}

/// Reads the directory at `path` and returns its entries in display order:
/// directories first, then files, ties broken by case-insensitive name.
/// Symlinks are resolved once for type information; unreadable entries are
/// skipped rather than failing the whole listing.
pub fn load_directory(path: &Path) -> Result<Vec<FileEntry>> {
    let read = fs::read_dir(path).map_err(|e| Error::io(path, e))?;
    let mut entries = Vec::with_capacity(256);

    for entry in read {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let name = entry.file_name();
        let name_lossy = name.to_string_lossy();
        let name_str = name_lossy.to_string();
        let lowercase_name = name_lossy.to_lowercase();
        let full_path = entry.path();

        let Ok(link_meta) = fs::symlink_metadata(&full_path) else {
            continue;
        };
        let is_symlink = link_meta.file_type().is_symlink();
        // Symlinks are resolved once so type, size and mtime describe the
        // target; a broken link falls back to the link itself.
        let meta = if is_symlink {
            fs::metadata(&full_path).unwrap_or(link_meta)
        } else {
            link_meta
        };
        let symlink_target = if is_symlink {
            fs::read_link(&full_path).ok()
        } else {
            None
        };

        let hidden = is_hidden(&full_path, &name_str);
        entries.push(FileEntry {
            name,
            name_str,
            lowercase_name,
            is_dir: meta.is_dir(),
            is_symlink,
            symlink_target,
            size: meta.len(),
            modified: meta.modified().ok(),
            mode: mode_bits(&meta),
            is_hidden: hidden,
            path: full_path,
        });
    }

    sort_entries(&mut entries);
    Ok(entries)
}

/// Directories first, case-insensitive name within each group.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        match (a.is_dir(), b.is_dir()) {
            (true, false) => return std::cmp::Ordering::Less,
            (false, true) => return std::cmp::Ordering::Greater,
            _ => {}
        }
        a.lowercase_name().cmp(b.lowercase_name())
    });
}

/// Reads up to `byte_limit` bytes from the start of the file.
pub fn read_file_head(path: &Path, byte_limit: usize) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut buf = Vec::with_capacity(byte_limit.min(64 * 1024));
    file.take(byte_limit as u64)
        .read_to_end(&mut buf)
        .map_err(|e| Error::io(path, e))?;
    Ok(buf)
}

/// A small head sample used only for text/binary classification.
pub fn read_text_sample(path: &Path) -> Result<Vec<u8>> {
    read_file_head(path, TEXT_SAMPLE_BYTES)
}

/// Classifies a file as text. Known-binary extensions are rejected without
/// looking at content; otherwise a NUL within the first 512 sample bytes
/// marks it binary. Empty files are text.
pub fn is_text_file(path: &Path, sample: &[u8]) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let lower = ext.to_ascii_lowercase();
        if BINARY_EXTENSIONS.contains(&lower.as_str()) {
            return false;
        }
    }
    if sample.is_empty() {
        return true;
    }
    // UTF-16 text is full of NULs; rule it in before the NUL check.
    if detect_encoding(sample).is_utf16() {
        return true;
    }
    !sample[..sample.len().min(BINARY_PEEK_BYTES)].contains(&0)
}

/// Detects the text encoding of a file head by BOM, falling back to the
/// even/odd NUL pattern UTF-16 without a BOM produces for ASCII-heavy text.
pub fn detect_encoding(head: &[u8]) -> TextEncoding {
    if head.len() >= 3 && head[..3] == [0xEF, 0xBB, 0xBF] {
        return TextEncoding::Utf8Bom;
    }
    if head.len() >= 2 {
        if head[..2] == [0xFF, 0xFE] {
            return TextEncoding::Utf16Le;
        }
        if head[..2] == [0xFE, 0xFF] {
            return TextEncoding::Utf16Be;
        }
    }

    // BOM-less UTF-16: ASCII text encodes as alternating data/NUL bytes.
    let window = &head[..head.len().min(BINARY_PEEK_BYTES)];
    if window.len() >= 4 {
        let mut even_nul = 0usize;
        let mut odd_nul = 0usize;
        for (i, b) in window.iter().enumerate() {
            if *b == 0 {
                if i % 2 == 0 {
                    even_nul += 1;
                } else {
                    odd_nul += 1;
                }
            }
        }
        let pairs = window.len() / 2;
        if odd_nul > pairs / 2 && even_nul == 0 {
            return TextEncoding::Utf16Le;
        }
        if even_nul > pairs / 2 && odd_nul == 0 {
            return TextEncoding::Utf16Be;
        }
    }

    TextEncoding::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_detection_by_bom() {
        assert_eq!(detect_encoding(&[0xEF, 0xBB, 0xBF, b'a']), TextEncoding::Utf8Bom);
        assert_eq!(detect_encoding(&[0xFF, 0xFE, b'a', 0]), TextEncoding::Utf16Le);
        assert_eq!(detect_encoding(&[0xFE, 0xFF, 0, b'a']), TextEncoding::Utf16Be);
        assert_eq!(detect_encoding(b"plain text"), TextEncoding::Unknown);
    }

    #[test]
    fn encoding_detection_by_nul_pattern() {
        // "abcd" as BOM-less UTF-16LE
        let le: Vec<u8> = b"abcd".iter().flat_map(|b| [*b, 0]).collect();
        assert_eq!(detect_encoding(&le), TextEncoding::Utf16Le);
        let be: Vec<u8> = b"abcd".iter().flat_map(|b| [0, *b]).collect();
        assert_eq!(detect_encoding(&be), TextEncoding::Utf16Be);
    }

    #[test]
    fn binary_classification() {
        let p = Path::new("file.rs");
        assert!(is_text_file(p, b"fn main() {}"));
        assert!(!is_text_file(p, b"ab\0cd"));
        assert!(is_text_file(p, b""));
        assert!(!is_text_file(Path::new("img.png"), b"anything"));
    }

    #[test]
    fn utf16_sample_is_text_despite_nuls() {
        let le: Vec<u8> = b"hello world, long enough sample"
            .iter()
            .flat_map(|b| [*b, 0])
            .collect();
        assert!(is_text_file(Path::new("file.txt"), &le));
    }
}

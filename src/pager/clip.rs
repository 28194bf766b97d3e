//! Clipboard export from the pager.
//!
//! `c` copies exactly the rows on screen (sanitized, ANSI stripped); `C`
//! copies the whole file, streaming line-by-line through a pipe when the
//! clipboard tool supports it. Very large files warn, absurd ones refuse.

use crate::core::external::{ClipboardSpec, copy_lines};
use crate::core::text::{sanitize, strip_sgr};
use crate::error::{Error, Result};
use crate::pager::source::PagerSource;

/// Whole-file copies at or above this size surface a warning status.
pub const COPY_WARN_BYTES: u64 = 16 * 1024 * 1024;
/// Whole-file copies at or above this size are refused.
pub const COPY_REFUSE_BYTES: u64 = 128 * 1024 * 1024;

fn mib(bytes: u64) -> String {
    format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
}

/// Copies the visible rows verbatim. Returns the success status message.
pub fn copy_visible(clip: &ClipboardSpec, rows: &[String]) -> Result<String> {
    let cleaned: Vec<String> = rows.iter().map(|r| sanitize(&strip_sgr(r))).collect();
    let count = cleaned.len();
    copy_lines(clip, cleaned)?;
    Ok(format!("copied {count} lines"))
}

/// Copies the entire source. Streaming text sources are loaded to EOF
/// first; the content then streams through the clipboard pipe one line at
/// a time. Returns the success status message, or a policy error for
/// files past the hard limit.
pub fn copy_all(clip: &ClipboardSpec, source: &mut PagerSource) -> Result<String> {
    let byte_size = match source {
        PagerSource::Directory(d) => d.rows.iter().map(|r| r.len() as u64 + 1).sum(),
        PagerSource::Text(t) => {
            t.ensure_all()?;
            t.records()
                .iter()
                .map(|r| r.length as u64 + 1)
                .sum()
        }
        PagerSource::Binary(b) => b.total_bytes(),
    };

    if byte_size >= COPY_REFUSE_BYTES {
        return Err(Error::policy(format!(
            "refusing to copy {} (limit {})",
            mib(byte_size),
            mib(COPY_REFUSE_BYTES)
        )));
    }

    match source {
        PagerSource::Directory(d) => {
            copy_lines(clip, d.rows.iter().cloned())?;
        }
        PagerSource::Text(t) => {
            let count = t.line_count();
            let mut idx = 0usize;
            let mut failed: Option<crate::error::Error> = None;
            copy_lines(
                clip,
                std::iter::from_fn(|| {
                    if idx >= count || failed.is_some() {
                        return None;
                    }
                    let line = match t.line(idx) {
                        Ok(line) => line,
                        Err(e) => {
                            failed = Some(e);
                            return None;
                        }
                    };
                    idx += 1;
                    Some(line)
                }),
            )?;
            if let Some(e) = failed {
                return Err(e);
            }
        }
        PagerSource::Binary(b) => {
            let count = b.line_count();
            let mut idx = 0usize;
            let mut failed: Option<crate::error::Error> = None;
            copy_lines(
                clip,
                std::iter::from_fn(|| {
                    if idx >= count || failed.is_some() {
                        return None;
                    }
                    let row = match b.line(idx) {
                        Ok(row) => row,
                        Err(e) => {
                            failed = Some(e);
                            return None;
                        }
                    };
                    idx += 1;
                    Some(row)
                }),
            )?;
            if let Some(e) = failed {
                return Err(e);
            }
        }
    }

    if byte_size >= COPY_WARN_BYTES {
        Ok(format!("copied all ({}) — large file", mib(byte_size)))
    } else {
        Ok(format!("copied all ({})", mib(byte_size)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mib_formatting() {
        assert_eq!(mib(10 * 1024 * 1024), "10.0 MiB");
        assert_eq!(mib(16 * 1024 * 1024 + 512 * 1024), "16.5 MiB");
    }
}

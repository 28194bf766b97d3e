//! Clipboard export tests using a stub tool that captures its stdin.

#![cfg(unix)]

use rdir_tui::core::external::{ClipboardSpec, CommandSpec};
use rdir_tui::core::fsx::FileEntry;
use rdir_tui::core::preview::build_preview;
use rdir_tui::pager::clip::{copy_all, copy_visible};
use rdir_tui::pager::source::PagerSource;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn capture_clipboard(capture_path: &Path) -> ClipboardSpec {
    ClipboardSpec {
        command: CommandSpec {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                format!("cat > '{}'", capture_path.display()),
            ],
        },
        pipe: true,
    }
}

#[test]
fn copy_visible_strips_ansi_and_joins_lf() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let capture = dir.path().join("capture.txt");
    let clip = capture_clipboard(&capture);

    let rows = vec![
        "\u{1B}[1mbold row\u{1B}[0m".to_string(),
        "plain row".to_string(),
    ];
    let message = copy_visible(&clip, &rows)?;
    assert_eq!(message, "copied 2 lines");

    let captured = fs::read_to_string(&capture)?;
    assert_eq!(captured, "bold row\nplain row");
    Ok(())
}

#[test]
fn copy_all_streams_whole_file_with_size_message() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let capture = dir.path().join("capture.txt");
    let clip = capture_clipboard(&capture);

    // 163840 lines of 64 bytes = exactly 10 MiB on disk.
    let path = dir.path().join("big.txt");
    let mut f = File::create(&path)?;
    let line = "z".repeat(63);
    for _ in 0..163_840 {
        writeln!(f, "{line}")?;
    }
    drop(f);

    let entry = FileEntry::from_path(&path)?;
    let preview = build_preview(&entry, 64 * 1024, 80)?;
    assert!(preview.truncated, "head must not cover 10 MiB");

    let mut source = PagerSource::open(&path, &preview);
    let message = copy_all(&clip, &mut source)?;
    assert_eq!(message, "copied all (10.0 MiB)");

    let captured = fs::read_to_string(&capture)?;
    assert_eq!(captured.lines().count(), 163_840);
    assert!(captured.lines().all(|l| l == line));
    Ok(())
}

#[test]
fn copy_all_refuses_past_hard_limit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let capture = dir.path().join("capture.txt");
    let clip = capture_clipboard(&capture);

    // A sparse-looking binary source: no data is read before the policy
    // check, so the file itself can stay small.
    let path = dir.path().join("huge.bin");
    fs::write(&path, [0u8; 16])?;
    let mut source = PagerSource::Binary(rdir_tui::pager::source::BinarySource::new(
        path,
        256 * 1024 * 1024,
    ));

    let err = copy_all(&clip, &mut source).expect_err("must refuse");
    let text = err.to_string();
    assert!(text.contains("refusing to copy"), "got: {text}");
    assert!(!capture.exists(), "nothing may reach the clipboard");
    Ok(())
}

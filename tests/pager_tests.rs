//! Tests for the pager's streaming search, wrap metrics over real sources,
//! and the persist-back contract.

use rdir_tui::core::fsx::FileEntry;
use rdir_tui::core::preview::{PreviewData, build_preview};
use rdir_tui::pager::search::execute_search;
use rdir_tui::pager::source::{PagerSource, TextSource};
use rdir_tui::pager::wrap::RowMetrics;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn preview_for(path: &Path, limit: usize) -> PreviewData {
    let entry = FileEntry::from_path(path).expect("entry");
    build_preview(&entry, limit, 80).expect("preview")
}

#[test]
fn search_streams_until_hit_is_loaded() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("long.txt");
    let mut f = File::create(&path)?;
    for i in 0..300 {
        writeln!(f, "line-{i:03}")?;
    }
    drop(f);

    // Head covers only the first few lines.
    let preview = preview_for(&path, 45);
    assert!(preview.truncated);
    let mut source = PagerSource::open(&path, &preview);
    let PagerSource::Text(text) = &source else {
        panic!("expected text source");
    };
    assert!(text.line_count() < 123, "head must not already cover the hit");

    let outcome = execute_search(&mut source, "line-123")?;
    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.hits[0].line, 123);
    assert_eq!(outcome.hits[0].start_col, 0);
    assert_eq!(outcome.hits[0].end_col, 8);

    let PagerSource::Text(text) = &source else {
        panic!("expected text source");
    };
    assert!(text.line_count() > 123, "search must have streamed the file");
    Ok(())
}

#[test]
fn smart_case_is_haystack_case_invariant() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let lower = dir.path().join("lower.txt");
    let upper = dir.path().join("upper.txt");
    fs::write(&lower, "needle here\nplain\nneedle again\n")?;
    fs::write(&upper, "NEEDLE here\nplain\nNeEdLe again\n")?;

    let mut source_a = PagerSource::open(&lower, &preview_for(&lower, 4096));
    let mut source_b = PagerSource::open(&upper, &preview_for(&upper, 4096));

    let hits_a = execute_search(&mut source_a, "needle")?.hits;
    let hits_b = execute_search(&mut source_b, "needle")?.hits;
    let lines_a: Vec<usize> = hits_a.iter().map(|h| h.line).collect();
    let lines_b: Vec<usize> = hits_b.iter().map(|h| h.line).collect();
    assert_eq!(lines_a, lines_b, "lowercase query must ignore haystack case");

    // An uppercase rune in the query switches to exact matching.
    let exact = execute_search(&mut source_b, "NEEDLE")?.hits;
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].line, 0);
    Ok(())
}

#[test]
fn wrap_metrics_match_streamed_widths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("wide.txt");
    let mut f = File::create(&path)?;
    writeln!(f, "short")?;
    writeln!(f, "{}", "x".repeat(100))?;
    writeln!(f, "{}", "y".repeat(41))?;
    write!(f, "tail")?;
    drop(f);

    let preview = preview_for(&path, 4096);
    let mut source = TextSource::from_preview(path, &preview);
    source.ensure_all()?;

    let widths: Vec<usize> = source.records().iter().map(|r| r.display_width).collect();
    let mut metrics = RowMetrics::new();
    metrics.rebuild(widths.clone(), 40, true);

    let spans: Vec<usize> = (0..widths.len()).map(|i| metrics.row_span(i)).collect();
    assert_eq!(spans, vec![1, 3, 2, 1]);
    let total: usize = spans.iter().sum();
    assert_eq!(metrics.total_rows(), total);

    // A line wider than the pane is reachable one row offset at a time,
    // and the step after its last row lands on the next line.
    assert_eq!(metrics.line_at_row(1), (1, 0));
    assert_eq!(metrics.line_at_row(2), (1, 1));
    assert_eq!(metrics.line_at_row(3), (1, 2));
    assert_eq!(metrics.line_at_row(4), (2, 0));
    Ok(())
}

#[test]
fn persist_back_reflects_streamed_content() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("grow.txt");
    let mut f = File::create(&path)?;
    for i in 0..200 {
        writeln!(f, "row number {i}")?;
    }
    drop(f);

    let mut preview = preview_for(&path, 64);
    assert!(preview.truncated);
    let seeded = preview.text_lines.len();

    let mut source = TextSource::from_preview(path.clone(), &preview);
    source.ensure_all()?;
    source.persist_loaded_lines(&mut preview)?;

    assert!(!preview.truncated);
    assert!(preview.remainder.is_empty());
    assert_eq!(preview.text_lines.len(), 200);
    assert!(preview.text_lines.len() > seeded);
    assert_eq!(preview.line_count, 200);
    assert_eq!(preview.text_lines.len(), preview.text_line_meta.len());

    let sum: usize = preview.text_line_meta.iter().map(|m| m.rune_count).sum();
    assert_eq!(sum, preview.text_char_count);

    // Reopening from the persisted preview starts fully loaded and shows
    // the same content.
    let mut reopened = TextSource::from_preview(path, &preview);
    assert!(reopened.fully_loaded());
    assert_eq!(reopened.line(150)?, "row number 150");
    assert_eq!(reopened.line(150)?, preview.text_lines[150]);
    Ok(())
}

#[test]
fn binary_search_reports_hex_columns() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("blob.bin");
    let mut bytes = vec![0u8; 256];
    bytes[0x20..0x22].copy_from_slice(&[0xCA, 0xFE]);
    fs::write(&path, &bytes)?;
    // force the binary classification with a known-binary extension and a
    // NUL-filled head
    let preview = preview_for(&path, 4096);
    assert!(preview.binary_info.is_some());

    let mut source = PagerSource::open(&path, &preview);
    let outcome = execute_search(&mut source, ":cafe")?;
    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.hits[0].line, 2, "0x20 sits in the third row");
    assert_eq!(outcome.hits[0].start_col, 10);

    // invalid hex digits surface as an error
    assert!(execute_search(&mut source, ":zz").is_err());
    Ok(())
}

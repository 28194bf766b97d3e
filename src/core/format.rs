//! Formatted preview views for rdir.
//!
//! Turns the raw text head of a Markdown or JSON file into styled-segment
//! lines the preview pane and the pager can draw with theme styles. The raw
//! view always stays available; formatting failures only record a reason.

use crate::core::text::{display_width, grapheme_width};

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use unicode_segmentation::UnicodeSegmentation;

use std::path::Path;

/// Style class of one segment. Translated to concrete terminal attributes
/// by the renderer's theme table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentStyle {
    Plain,
    Strong,
    Emphasis,
    Heading,
    Code,
    CodeBlock,
    Strike,
    Link,
    Rule,
}

/// A run of text drawn with a single style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledTextSegment {
    pub text: String,
    pub style: SegmentStyle,
}

impl StyledTextSegment {
    pub fn new(text: impl Into<String>, style: SegmentStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Per-row metadata for a formatted line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyledLineMeta {
    pub rune_count: usize,
    pub display_width: usize,
}

/// Advisory kind of the formatted view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormattedKind {
    #[default]
    None,
    Markdown,
    Json,
}

impl FormattedKind {
    pub fn label(&self) -> &'static str {
        match self {
            FormattedKind::None => "none",
            FormattedKind::Markdown => "markdown",
            FormattedKind::Json => "json",
        }
    }
}

/// Formatted kind a path is eligible for, by extension.
pub fn formatted_kind_for(path: &Path) -> FormattedKind {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("md") | Some("markdown") => FormattedKind::Markdown,
        Some("json") => FormattedKind::Json,
        _ => FormattedKind::None,
    }
}

pub type StyledLines = (Vec<Vec<StyledTextSegment>>, Vec<StyledLineMeta>);

fn meta_for(segments: &[StyledTextSegment]) -> StyledLineMeta {
    let mut rune_count = 0;
    let mut width = 0;
    for seg in segments {
        rune_count += seg.text.chars().count();
        width += display_width(&seg.text);
    }
    StyledLineMeta {
        rune_count,
        display_width: width,
    }
}

/// Splits a styled line into rows of at most `width` display columns,
/// breaking segments at grapheme boundaries. Rows never split an SGR-free
/// segment mid-cluster.
fn reflow_line(line: Vec<StyledTextSegment>, width: usize) -> Vec<Vec<StyledTextSegment>> {
    if width == 0 {
        return vec![line];
    }
    let total: usize = line.iter().map(|s| display_width(&s.text)).sum();
    if total <= width {
        return vec![line];
    }

    let mut rows = Vec::new();
    let mut row: Vec<StyledTextSegment> = Vec::new();
    let mut used = 0usize;

    for seg in line {
        let mut current = String::new();
        for cluster in seg.text.graphemes(true) {
            let w = grapheme_width(cluster);
            if used + w > width && used > 0 {
                if !current.is_empty() {
                    row.push(StyledTextSegment::new(current.clone(), seg.style));
                    current.clear();
                }
                rows.push(std::mem::take(&mut row));
                used = 0;
            }
            current.push_str(cluster);
            used += w;
        }
        if !current.is_empty() {
            row.push(StyledTextSegment::new(current, seg.style));
        }
    }
    if !row.is_empty() {
        rows.push(row);
    }
    if rows.is_empty() {
        rows.push(Vec::new());
    }
    rows
}

fn push_line(
    out: &mut Vec<Vec<StyledTextSegment>>,
    line: Vec<StyledTextSegment>,
    target_width: usize,
    wrap: bool,
) {
    if wrap {
        out.extend(reflow_line(line, target_width));
    } else {
        out.push(line);
    }
}

/// Renders Markdown source lines into styled-segment rows.
///
/// `target_width` bounds reflow when `wrap` is set; `max_lines` caps the
/// number of produced rows. Fenced code blocks keep their internal
/// whitespace; horizontal rules become a single empty rule-styled segment
/// the renderer expands to the panel width.
pub fn format_markdown(
    lines: &[String],
    target_width: usize,
    max_lines: usize,
    wrap: bool,
) -> StyledLines {
    let source = lines.join("\n");
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(&source, options);
    let mut out: Vec<Vec<StyledTextSegment>> = Vec::new();
    let mut current: Vec<StyledTextSegment> = Vec::new();

    let mut strong = 0usize;
    let mut emphasis = 0usize;
    let mut strike = 0usize;
    let mut heading = 0usize;
    let mut link = 0usize;
    let mut quote_depth = 0usize;
    let mut in_code_block = false;
    // (ordinal counter, is_ordered) per nesting level
    let mut list_stack: Vec<Option<u64>> = Vec::new();
    let mut pending_item_prefix = false;

    let mut flush =
        |current: &mut Vec<StyledTextSegment>, out: &mut Vec<Vec<StyledTextSegment>>| {
            if !current.is_empty() {
                push_line(out, std::mem::take(current), target_width, wrap);
            }
        };

    let style_of = |strong: usize, emphasis: usize, strike: usize, heading: usize, link: usize| {
        if heading > 0 {
            SegmentStyle::Heading
        } else if link > 0 {
            SegmentStyle::Link
        } else if strike > 0 {
            SegmentStyle::Strike
        } else if strong > 0 {
            SegmentStyle::Strong
        } else if emphasis > 0 {
            SegmentStyle::Emphasis
        } else {
            SegmentStyle::Plain
        }
    };

    for event in parser {
        if out.len() >= max_lines {
            break;
        }
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    flush(&mut current, &mut out);
                    heading += 1;
                    let marker = "#".repeat(level as usize);
                    current.push(StyledTextSegment::new(
                        format!("{marker} "),
                        SegmentStyle::Heading,
                    ));
                }
                Tag::Emphasis => emphasis += 1,
                Tag::Strong => strong += 1,
                Tag::Strikethrough => strike += 1,
                Tag::Link { .. } => link += 1,
                Tag::BlockQuote(_) => {
                    flush(&mut current, &mut out);
                    quote_depth += 1;
                }
                Tag::CodeBlock(kind) => {
                    flush(&mut current, &mut out);
                    in_code_block = true;
                    if let CodeBlockKind::Fenced(info) = kind
                        && !info.is_empty()
                    {
                        push_line(
                            &mut out,
                            vec![StyledTextSegment::new(
                                format!("```{info}"),
                                SegmentStyle::CodeBlock,
                            )],
                            target_width,
                            wrap,
                        );
                    }
                }
                Tag::List(start) => {
                    flush(&mut current, &mut out);
                    list_stack.push(start);
                }
                Tag::Item => {
                    flush(&mut current, &mut out);
                    pending_item_prefix = true;
                }
                Tag::Paragraph => {
                    if !pending_item_prefix {
                        flush(&mut current, &mut out);
                    }
                }
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    heading = heading.saturating_sub(1);
                    flush(&mut current, &mut out);
                }
                TagEnd::Emphasis => emphasis = emphasis.saturating_sub(1),
                TagEnd::Strong => strong = strong.saturating_sub(1),
                TagEnd::Strikethrough => strike = strike.saturating_sub(1),
                TagEnd::Link => link = link.saturating_sub(1),
                TagEnd::BlockQuote(_) => {
                    flush(&mut current, &mut out);
                    quote_depth = quote_depth.saturating_sub(1);
                }
                TagEnd::CodeBlock => {
                    flush(&mut current, &mut out);
                    in_code_block = false;
                }
                TagEnd::List(_) => {
                    list_stack.pop();
                }
                TagEnd::Item => {
                    flush(&mut current, &mut out);
                }
                TagEnd::Paragraph => {
                    flush(&mut current, &mut out);
                }
                _ => {}
            },
            Event::Text(text) => {
                if in_code_block {
                    // Code blocks keep their whitespace, one row per line.
                    for (i, raw) in text.split('\n').enumerate() {
                        if i > 0 {
                            flush(&mut current, &mut out);
                        }
                        if raw.is_empty() && text.ends_with('\n') && i + 1 == text.split('\n').count()
                        {
                            continue;
                        }
                        current.push(StyledTextSegment::new(raw, SegmentStyle::CodeBlock));
                    }
                    continue;
                }

                if current.is_empty() {
                    if quote_depth > 0 {
                        current.push(StyledTextSegment::new(
                            "│ ".repeat(quote_depth),
                            SegmentStyle::Emphasis,
                        ));
                    }
                    if pending_item_prefix {
                        let depth = list_stack.len().saturating_sub(1);
                        let indent = "  ".repeat(depth);
                        let marker = match list_stack.last_mut() {
                            Some(Some(n)) => {
                                let m = format!("{indent}{n}. ");
                                *n += 1;
                                m
                            }
                            _ => format!("{indent}• "),
                        };
                        current.push(StyledTextSegment::new(marker, SegmentStyle::Plain));
                        pending_item_prefix = false;
                    }
                }

                current.push(StyledTextSegment::new(
                    text.to_string(),
                    style_of(strong, emphasis, strike, heading, link),
                ));
            }
            Event::Code(code) => {
                current.push(StyledTextSegment::new(code.to_string(), SegmentStyle::Code));
            }
            Event::SoftBreak => {
                current.push(StyledTextSegment::new(" ", SegmentStyle::Plain));
            }
            Event::HardBreak => {
                flush(&mut current, &mut out);
            }
            Event::Rule => {
                flush(&mut current, &mut out);
                // A rule row is a single empty rule-styled segment; the
                // renderer expands it to the panel width with `─`.
                out.push(vec![StyledTextSegment::new("", SegmentStyle::Rule)]);
            }
            Event::TaskListMarker(done) => {
                current.push(StyledTextSegment::new(
                    if done { "[x] " } else { "[ ] " },
                    SegmentStyle::Plain,
                ));
            }
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
    }

    if out.len() < max_lines && !current.is_empty() {
        push_line(&mut out, current, target_width, wrap);
    }
    out.truncate(max_lines);

    let meta = out.iter().map(|line| meta_for(line)).collect();
    (out, meta)
}

/// Pretty-prints a JSON head as styled segments (2-space indent): keys are
/// strong, strings plain, scalars code-styled. Returns the unavailable
/// reason when the head does not parse (common for truncated samples).
pub fn format_json(
    text: &str,
    target_width: usize,
    max_lines: usize,
    wrap: bool,
) -> std::result::Result<StyledLines, String> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| format!("not valid JSON: {e}"))?;

    let mut out: Vec<Vec<StyledTextSegment>> = Vec::new();
    let mut line: Vec<StyledTextSegment> = Vec::new();
    write_json(&value, 0, &mut line, &mut out, target_width, wrap, max_lines);
    if !line.is_empty() && out.len() < max_lines {
        push_line(&mut out, line, target_width, wrap);
    }
    out.truncate(max_lines);

    let meta = out.iter().map(|l| meta_for(l)).collect();
    Ok((out, meta))
}

fn indent_seg(depth: usize) -> StyledTextSegment {
    StyledTextSegment::new("  ".repeat(depth), SegmentStyle::Plain)
}

#[allow(clippy::too_many_arguments)]
fn write_json(
    value: &serde_json::Value,
    depth: usize,
    line: &mut Vec<StyledTextSegment>,
    out: &mut Vec<Vec<StyledTextSegment>>,
    width: usize,
    wrap: bool,
    max_lines: usize,
) {
    use serde_json::Value;

    if out.len() >= max_lines {
        return;
    }

    match value {
        Value::Object(map) => {
            if map.is_empty() {
                line.push(StyledTextSegment::new("{}", SegmentStyle::Plain));
                return;
            }
            line.push(StyledTextSegment::new("{", SegmentStyle::Plain));
            push_line(out, std::mem::take(line), width, wrap);
            let last = map.len() - 1;
            for (i, (key, val)) in map.iter().enumerate() {
                if out.len() >= max_lines {
                    return;
                }
                line.push(indent_seg(depth + 1));
                line.push(StyledTextSegment::new(
                    format!("\"{key}\""),
                    SegmentStyle::Strong,
                ));
                line.push(StyledTextSegment::new(": ", SegmentStyle::Plain));
                write_json(val, depth + 1, line, out, width, wrap, max_lines);
                if i != last {
                    line.push(StyledTextSegment::new(",", SegmentStyle::Plain));
                }
                push_line(out, std::mem::take(line), width, wrap);
            }
            line.push(indent_seg(depth));
            line.push(StyledTextSegment::new("}", SegmentStyle::Plain));
        }
        Value::Array(items) => {
            if items.is_empty() {
                line.push(StyledTextSegment::new("[]", SegmentStyle::Plain));
                return;
            }
            line.push(StyledTextSegment::new("[", SegmentStyle::Plain));
            push_line(out, std::mem::take(line), width, wrap);
            let last = items.len() - 1;
            for (i, item) in items.iter().enumerate() {
                if out.len() >= max_lines {
                    return;
                }
                line.push(indent_seg(depth + 1));
                write_json(item, depth + 1, line, out, width, wrap, max_lines);
                if i != last {
                    line.push(StyledTextSegment::new(",", SegmentStyle::Plain));
                }
                push_line(out, std::mem::take(line), width, wrap);
            }
            line.push(indent_seg(depth));
            line.push(StyledTextSegment::new("]", SegmentStyle::Plain));
        }
        Value::String(s) => {
            line.push(StyledTextSegment::new(
                serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\"")),
                SegmentStyle::Plain,
            ));
        }
        Value::Number(n) => {
            line.push(StyledTextSegment::new(n.to_string(), SegmentStyle::Code));
        }
        Value::Bool(b) => {
            line.push(StyledTextSegment::new(b.to_string(), SegmentStyle::Code));
        }
        Value::Null => {
            line.push(StyledTextSegment::new("null", SegmentStyle::Code));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &[StyledTextSegment]) -> String {
        line.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn markdown_heading_is_heading_styled() {
        let lines = vec!["# Title".to_string(), "".to_string(), "body".to_string()];
        let (rows, meta) = format_markdown(&lines, 80, 100, false);
        assert_eq!(rows.len(), meta.len());
        assert_eq!(text_of(&rows[0]), "# Title");
        assert!(rows[0].iter().all(|s| s.style == SegmentStyle::Heading));
        assert_eq!(text_of(&rows[1]), "body");
    }

    #[test]
    fn markdown_rule_is_single_empty_segment() {
        let lines = vec!["above".to_string(), "".to_string(), "---".to_string()];
        let (rows, _) = format_markdown(&lines, 80, 100, false);
        let rule = rows
            .iter()
            .find(|r| r.len() == 1 && r[0].style == SegmentStyle::Rule)
            .expect("rule row present");
        assert!(rule[0].text.is_empty());
    }

    #[test]
    fn markdown_code_block_keeps_whitespace() {
        let lines = vec![
            "```rust".to_string(),
            "fn main() {".to_string(),
            "    body();".to_string(),
            "}".to_string(),
            "```".to_string(),
        ];
        let (rows, _) = format_markdown(&lines, 80, 100, false);
        let indented = rows
            .iter()
            .find(|r| text_of(r).starts_with("    body"))
            .expect("indented code row");
        assert!(indented.iter().all(|s| s.style == SegmentStyle::CodeBlock));
    }

    #[test]
    fn markdown_inline_styles() {
        let lines = vec!["**bold** and *soft* and `code`".to_string()];
        let (rows, _) = format_markdown(&lines, 80, 100, false);
        let styles: Vec<SegmentStyle> = rows[0].iter().map(|s| s.style).collect();
        assert!(styles.contains(&SegmentStyle::Strong));
        assert!(styles.contains(&SegmentStyle::Emphasis));
        assert!(styles.contains(&SegmentStyle::Code));
    }

    #[test]
    fn markdown_wrap_respects_width() {
        let lines = vec!["word ".repeat(20).trim_end().to_string()];
        let (rows, meta) = format_markdown(&lines, 20, 100, true);
        assert!(rows.len() > 1, "long paragraph must reflow");
        for m in &meta {
            assert!(m.display_width <= 20, "row wider than target: {}", m.display_width);
        }
    }

    #[test]
    fn json_pretty_prints_with_two_space_indent() {
        let (rows, meta) =
            format_json(r#"{"name":"x","n":3,"ok":true}"#, 80, 100, false).expect("valid json");
        assert_eq!(rows.len(), meta.len());
        let all: Vec<String> = rows.iter().map(|r| text_of(r)).collect();
        assert_eq!(all[0], "{");
        assert!(all[1].starts_with("  \""), "members indent by two: {:?}", all[1]);
        assert!(all.iter().any(|l| l.contains("\"name\": \"x\"")));
        assert_eq!(all.last().map(String::as_str), Some("}"));
    }

    #[test]
    fn json_failure_yields_reason() {
        let err = format_json("{not json", 80, 100, false).unwrap_err();
        assert!(err.contains("not valid JSON"));
    }

    #[test]
    fn kind_by_extension() {
        assert_eq!(formatted_kind_for(Path::new("a.md")), FormattedKind::Markdown);
        assert_eq!(
            formatted_kind_for(Path::new("a.markdown")),
            FormattedKind::Markdown
        );
        assert_eq!(formatted_kind_for(Path::new("a.json")), FormattedKind::Json);
        assert_eq!(formatted_kind_for(Path::new("a.rs")), FormattedKind::None);
    }
}

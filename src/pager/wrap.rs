//! Wrap metrics for the pager.
//!
//! With wrap off every source line is one row. With wrap on, a row-metrics
//! table maps each source line to its row span plus a prefix-sum array of
//! total rows, so scroll positions translate in O(log n). The table is
//! extended in place as the streaming source appends lines and rebuilt only
//! when the width or the wrap flag changes.

/// Row span bookkeeping for one (width, wrap) configuration.
pub struct RowMetrics {
    spans: Vec<usize>,
    /// `prefix[i]` is the total rows of lines `0..i`; one longer than
    /// `spans`.
    prefix: Vec<usize>,
    width: usize,
    wrap: bool,
}

impl RowMetrics {
    pub fn new() -> Self {
        Self {
            spans: Vec::new(),
            prefix: vec![0],
            width: 0,
            wrap: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn wrap(&self) -> bool {
        self.wrap
    }

    pub fn line_count(&self) -> usize {
        self.spans.len()
    }

    pub fn total_rows(&self) -> usize {
        *self.prefix.last().expect("prefix never empty")
    }

    /// True when the table no longer matches the pane configuration and
    /// must be rebuilt from scratch.
    pub fn stale_for(&self, width: usize, wrap: bool) -> bool {
        self.width != width || self.wrap != wrap
    }

    /// Rebuilds the table from all line widths.
    pub fn rebuild<I>(&mut self, widths: I, width: usize, wrap: bool)
    where
        I: IntoIterator<Item = usize>,
    {
        self.spans.clear();
        self.prefix.clear();
        self.prefix.push(0);
        self.width = width;
        self.wrap = wrap;
        self.extend(widths);
    }

    /// Appends spans for newly streamed lines without touching existing
    /// entries.
    pub fn extend<I>(&mut self, widths: I)
    where
        I: IntoIterator<Item = usize>,
    {
        let mut total = self.total_rows();
        for line_width in widths {
            let span = self.span_for(line_width);
            self.spans.push(span);
            total += span;
            self.prefix.push(total);
        }
    }

    fn span_for(&self, line_width: usize) -> usize {
        if !self.wrap || self.width == 0 {
            return 1;
        }
        line_width.div_ceil(self.width).max(1)
    }

    /// Rows occupied by source line `line`.
    pub fn row_span(&self, line: usize) -> usize {
        self.spans.get(line).copied().unwrap_or(1)
    }

    /// First absolute row of source line `line`.
    pub fn first_row_of(&self, line: usize) -> usize {
        self.prefix
            .get(line)
            .copied()
            .unwrap_or_else(|| self.total_rows())
    }

    /// Absolute row of `(line, wrap_offset)`, clamping the offset into the
    /// line's span.
    pub fn row_of(&self, line: usize, wrap_offset: usize) -> usize {
        let clamped = wrap_offset.min(self.row_span(line).saturating_sub(1));
        self.first_row_of(line) + clamped
    }

    /// Maps an absolute row back to `(line, wrap_offset)`.
    pub fn line_at_row(&self, row: usize) -> (usize, usize) {
        if self.spans.is_empty() {
            return (0, 0);
        }
        let row = row.min(self.total_rows().saturating_sub(1));
        // partition_point returns the first line whose prefix exceeds row.
        let line = self.prefix.partition_point(|&p| p <= row).saturating_sub(1);
        let line = line.min(self.spans.len() - 1);
        (line, row - self.prefix[line])
    }
}

impl Default for RowMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_wrap_is_one_row_per_line() {
        let mut m = RowMetrics::new();
        m.rebuild([5, 500, 0], 40, false);
        assert_eq!(m.total_rows(), 3);
        assert_eq!(m.row_span(1), 1);
    }

    #[test]
    fn wrap_spans_are_ceil_of_width() {
        let mut m = RowMetrics::new();
        m.rebuild([5, 80, 81, 0], 40, true);
        assert_eq!(m.row_span(0), 1);
        assert_eq!(m.row_span(1), 2);
        assert_eq!(m.row_span(2), 3);
        assert_eq!(m.row_span(3), 1, "empty line still occupies a row");
        assert_eq!(m.total_rows(), 7);
    }

    #[test]
    fn sum_of_spans_equals_total_rows() {
        let widths = [0usize, 1, 39, 40, 41, 79, 80, 81, 200];
        let mut m = RowMetrics::new();
        m.rebuild(widths, 40, true);
        let sum: usize = (0..widths.len()).map(|i| m.row_span(i)).sum();
        assert_eq!(sum, m.total_rows());
        for (i, w) in widths.iter().enumerate() {
            assert_eq!(m.row_span(i), w.div_ceil(40).max(1));
        }
    }

    #[test]
    fn row_mapping_round_trips() {
        let mut m = RowMetrics::new();
        m.rebuild([10, 100, 10], 40, true);
        // line 1 spans rows 1..4
        assert_eq!(m.first_row_of(1), 1);
        assert_eq!(m.row_of(1, 2), 3);
        assert_eq!(m.line_at_row(0), (0, 0));
        assert_eq!(m.line_at_row(2), (1, 1));
        assert_eq!(m.line_at_row(4), (2, 0));
    }

    #[test]
    fn extend_appends_without_rebuilding() {
        let mut m = RowMetrics::new();
        m.rebuild([10, 100], 40, true);
        let before = m.total_rows();
        m.extend([80]);
        assert_eq!(m.line_count(), 3);
        assert_eq!(m.total_rows(), before + 2);
        assert_eq!(m.row_span(2), 2);
    }

    #[test]
    fn staleness_detects_width_and_wrap_changes() {
        let mut m = RowMetrics::new();
        m.rebuild([10], 40, true);
        assert!(!m.stale_for(40, true));
        assert!(m.stale_for(41, true));
        assert!(m.stale_for(40, false));
    }
}

//! Fixed-capacity sliding window of samples and its ASCII rendering
//!
//! The buffer keeps the most recent `capacity` chart points with strict
//! FIFO eviction. Rendering scales the vertical axis over the current
//! buffer contents and the threshold, quantized into a fixed number of
//! rows; the caller (the CLI sink) applies color per cell.

use std::collections::VecDeque;

use crate::sample::ChartPoint;

/// Number of vertical rows in the rendered chart
pub const CHART_ROWS: usize = 8;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Classification of a single chart cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartCell {
    Empty,
    /// Only the heap-used bar reaches this row
    Heap,
    /// Only the resident-set bar reaches this row
    Rss,
    /// Both bars reach this row
    Both,
    /// The row closest to the threshold value; overrides bar marks
    Threshold,
}

/// One rendered row, top-first in `ChartRender::rows`
#[derive(Debug, Clone)]
pub struct ChartRow {
    /// Axis label for this row, in megabytes
    pub label_mb: f64,
    /// One cell per buffered point, oldest first
    pub cells: Vec<ChartCell>,
}

/// A scaled chart ready for display
#[derive(Debug, Clone)]
pub struct ChartRender {
    pub rows: Vec<ChartRow>,
    /// Number of columns (equals the number of buffered points)
    pub width: usize,
}

impl ChartRender {
    /// Plain-text rendering, used for tests and non-colored output
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&format!("{:>3.0}MB ", row.label_mb));
            for cell in &row.cells {
                out.push(match cell {
                    ChartCell::Empty => ' ',
                    ChartCell::Threshold => '─',
                    _ => '█',
                });
            }
            out.push('\n');
        }
        out
    }
}

/// Sliding window of recent chart points
#[derive(Debug)]
pub struct ChartBuffer {
    points: VecDeque<ChartPoint>,
    capacity: usize,
}

impl ChartBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when past capacity
    pub fn push(&mut self, point: ChartPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn contains(&self, point: &ChartPoint) -> bool {
        self.points.iter().any(|p| p == point)
    }

    /// Render the current window against the threshold.
    ///
    /// Returns `None` when fewer than two points are buffered (a single
    /// point cannot be scaled) or when the vertical span is zero.
    pub fn render(&self, threshold_bytes: u64) -> Option<ChartRender> {
        if self.points.len() < 2 {
            return None;
        }

        let rows = CHART_ROWS;
        let threshold_mb = threshold_bytes as f64 / BYTES_PER_MB;

        let heap_mb: Vec<f64> = self
            .points
            .iter()
            .map(|p| p.heap_used as f64 / BYTES_PER_MB)
            .collect();
        let rss_mb: Vec<f64> = self
            .points
            .iter()
            .map(|p| p.rss as f64 / BYTES_PER_MB)
            .collect();

        let max_value = heap_mb
            .iter()
            .chain(rss_mb.iter())
            .fold(threshold_mb, |max, &v| max.max(v));
        if max_value <= 0.0 {
            return None;
        }

        let threshold_row =
            ((threshold_mb * rows as f64 / max_value).round() as usize).min(rows - 1);

        let mut rendered = Vec::with_capacity(rows);
        for i in (0..rows).rev() {
            let label_mb = max_value * i as f64 / rows as f64;
            let cells = (0..self.points.len())
                .map(|j| {
                    let heap_level = (heap_mb[j] * rows as f64 / max_value).floor() as usize;
                    let rss_level = (rss_mb[j] * rows as f64 / max_value).floor() as usize;

                    if i == threshold_row {
                        ChartCell::Threshold
                    } else if i <= heap_level && i <= rss_level {
                        ChartCell::Both
                    } else if i <= heap_level {
                        ChartCell::Heap
                    } else if i <= rss_level {
                        ChartCell::Rss
                    } else {
                        ChartCell::Empty
                    }
                })
                .collect();

            rendered.push(ChartRow { label_mb, cells });
        }

        Some(ChartRender {
            rows: rendered,
            width: self.points.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const MB: u64 = 1024 * 1024;

    fn point(heap_used: u64, rss: u64) -> ChartPoint {
        ChartPoint {
            at: Utc::now(),
            heap_used,
            rss,
        }
    }

    #[test]
    fn capacity_is_strict_fifo() {
        let mut buffer = ChartBuffer::new(50);
        let first = point(1, 1);
        buffer.push(first);
        for i in 0..50 {
            buffer.push(point(100 + i, 100 + i));
        }

        assert_eq!(buffer.len(), 50);
        assert!(!buffer.contains(&first));
        assert!(buffer.contains(&point_with(&buffer)));
    }

    fn point_with(buffer: &ChartBuffer) -> ChartPoint {
        *buffer.points.back().unwrap()
    }

    #[test]
    fn render_empty_below_two_points() {
        let mut buffer = ChartBuffer::new(50);
        assert!(buffer.render(MB).is_none());
        buffer.push(point(10 * MB, 20 * MB));
        assert!(buffer.render(MB).is_none());
        buffer.push(point(10 * MB, 20 * MB));
        assert!(buffer.render(MB).is_some());
    }

    #[test]
    fn render_empty_when_span_is_zero() {
        let mut buffer = ChartBuffer::new(50);
        buffer.push(point(0, 0));
        buffer.push(point(0, 0));
        assert!(buffer.render(0).is_none());
    }

    #[test]
    fn render_shape_matches_buffer() {
        let mut buffer = ChartBuffer::new(50);
        for _ in 0..5 {
            buffer.push(point(10 * MB, 20 * MB));
        }

        let render = buffer.render(15 * MB).unwrap();
        assert_eq!(render.rows.len(), CHART_ROWS);
        assert_eq!(render.width, 5);
        for row in &render.rows {
            assert_eq!(row.cells.len(), 5);
        }
        // Rows come top-first; the top label is the full span
        assert!(render.rows[0].label_mb > render.rows[CHART_ROWS - 1].label_mb);
    }

    #[test]
    fn threshold_row_present_and_clamped() {
        let mut buffer = ChartBuffer::new(50);
        buffer.push(point(10 * MB, 10 * MB));
        buffer.push(point(10 * MB, 10 * MB));

        // Threshold above every sample: row index would round past the
        // top and must be clamped into range.
        let render = buffer.render(100 * MB).unwrap();
        let threshold_rows: Vec<_> = render
            .rows
            .iter()
            .filter(|r| r.cells.iter().all(|c| *c == ChartCell::Threshold))
            .collect();
        assert_eq!(threshold_rows.len(), 1);
        // Clamped to the top row
        assert!(render.rows[0].cells.iter().all(|c| *c == ChartCell::Threshold));
    }

    #[test]
    fn cell_classification_distinguishes_heap_and_rss() {
        let mut buffer = ChartBuffer::new(50);
        // rss well above heap so upper rows are rss-only
        buffer.push(point(2 * MB, 16 * MB));
        buffer.push(point(2 * MB, 16 * MB));

        let render = buffer.render(8 * MB).unwrap();
        let cells: Vec<ChartCell> = render.rows.iter().map(|r| r.cells[0]).collect();

        assert!(cells.contains(&ChartCell::Rss));
        assert!(cells.contains(&ChartCell::Both));
        assert!(cells.contains(&ChartCell::Threshold));
    }

    #[test]
    fn plain_text_has_one_line_per_row() {
        let mut buffer = ChartBuffer::new(50);
        buffer.push(point(5 * MB, 10 * MB));
        buffer.push(point(6 * MB, 12 * MB));

        let text = buffer.render(8 * MB).unwrap().to_plain_text();
        assert_eq!(text.lines().count(), CHART_ROWS);
        assert!(text.contains("MB "));
    }
}

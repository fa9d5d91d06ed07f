use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::element::ElementId;
use crate::error::{Result, StructureError};
use crate::logging::COLUMN_DETECTION;
use crate::rules::Thresholds;

/// A vertical reading column covering `[start_x, end_x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub index: usize,
    pub start_x: i32,
    pub end_x: i32,
}

impl ColumnRange {
    pub fn contains_x(&self, x: i32) -> bool {
        self.start_x <= x && x < self.end_x
    }

    pub fn width(&self) -> i32 {
        self.end_x - self.start_x
    }

    /// Stretch the range to `[start_x, end_x)` where that is wider, keeping
    /// the index.
    pub fn widened(&self, start_x: i32, end_x: i32) -> ColumnRange {
        ColumnRange {
            index: self.index,
            start_x: self.start_x.min(start_x),
            end_x: self.end_x.max(end_x),
        }
    }
}

/// Minimum horizontal gap between anchor X positions that separates columns.
pub fn gap_threshold(page_width: i32, thresholds: &Thresholds) -> f64 {
    let min = f64::from(thresholds.min_column_gap_px);
    let max = f64::from(thresholds.max_column_gap_px).max(min);
    (f64::from(page_width) * thresholds.column_gap_ratio).clamp(min, max)
}

/// Infer reading columns from the positions of anchor elements.
///
/// Distinct anchor X coordinates are sorted and every gap between neighbours
/// that is at least [`gap_threshold`] but no more than
/// `thresholds.max_column_gap_px` becomes a boundary at the gap's midpoint.
/// Wider gaps are treated as detector noise. The result always partitions
/// `[0, page_width)` into contiguous columns, indexed left to right.
pub fn detect_columns(
    anchor_positions: &IndexMap<ElementId, (i32, i32)>,
    page_width: i32,
    thresholds: &Thresholds,
) -> Result<Vec<ColumnRange>> {
    if page_width <= 0 {
        return Err(StructureError::invalid(format!(
            "page width must be positive, got {page_width}"
        )));
    }
    Ok(partition_columns(anchor_positions, page_width, thresholds))
}

/// [`detect_columns`] for a page width already known to be positive.
pub(crate) fn partition_columns(
    anchor_positions: &IndexMap<ElementId, (i32, i32)>,
    page_width: i32,
    thresholds: &Thresholds,
) -> Vec<ColumnRange> {
    debug_assert!(page_width > 0);
    let single = vec![ColumnRange {
        index: 0,
        start_x: 0,
        end_x: page_width,
    }];
    if anchor_positions.len() < 2 {
        return single;
    }

    let mut xs: Vec<i32> = anchor_positions.values().map(|&(x, _)| x).collect();
    xs.sort_unstable();
    xs.dedup();

    let threshold = gap_threshold(page_width, thresholds);
    let max_gap = i64::from(thresholds.max_column_gap_px);

    let mut boundaries: Vec<i32> = Vec::new();
    for pair in xs.windows(2) {
        let (left, right) = (i64::from(pair[0]), i64::from(pair[1]));
        let gap = right - left;
        if (gap as f64) < threshold {
            continue;
        }
        if gap > max_gap {
            debug!(target: COLUMN_DETECTION, left, right, gap, "ignoring oversized gap");
            continue;
        }
        // Midpoint of two i32 values always fits back into i32.
        let boundary = ((left + right) / 2) as i32;
        if boundary > 0 && boundary < page_width && boundaries.last() != Some(&boundary) {
            boundaries.push(boundary);
        }
    }

    if boundaries.is_empty() {
        return single;
    }

    let mut columns = Vec::with_capacity(boundaries.len() + 1);
    let mut start_x = 0;
    for end_x in boundaries.into_iter().chain(std::iter::once(page_width)) {
        columns.push(ColumnRange {
            index: columns.len(),
            start_x,
            end_x,
        });
        start_x = end_x;
    }

    debug!(
        target: COLUMN_DETECTION,
        anchors = anchor_positions.len(),
        threshold,
        columns = columns.len(),
        "detected columns"
    );
    columns
}

/// Index of the column an X coordinate belongs to. Coordinates left of the
/// page go to the first column, those right of it to the last.
pub fn column_index_for(columns: &[ColumnRange], x: i32) -> usize {
    columns
        .iter()
        .position(|c| c.contains_x(x))
        .unwrap_or_else(|| match columns.first() {
            Some(first) if x < first.start_x => 0,
            _ => columns.len().saturating_sub(1),
        })
}

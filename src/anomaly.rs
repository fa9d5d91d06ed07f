use serde::{Deserialize, Serialize};

use crate::element::ElementId;
use crate::sequence::SequenceGap;

/// A non-fatal problem found while structuring a page. Anomalies travel with
/// the result; the page is still structured on a best-effort basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// An irregular step in the numbers of one anchor class.
    SequenceGap { anchor_class: String, gap: SequenceGap },
    /// A reversal that looks like one misread digit.
    OcrSuspicion {
        anchor_class: String,
        before: i64,
        after: i64,
        suggested_value: i64,
    },
    /// A child outside every group's Y range, e.g. above the first anchor.
    UnassignedChild {
        element_id: ElementId,
        column: usize,
        y_position: i32,
    },
    /// Two anchors detected at identical coordinates.
    DuplicateAnchor {
        first: ElementId,
        duplicate: ElementId,
        x: i32,
        y: i32,
    },
    /// The declared page width was unusable and was inferred from the
    /// elements instead.
    InvalidPageWidth { declared: i32, inferred: i32 },
}

use serde::{Deserialize, Serialize};
use strsim::hamming;
use tracing::debug;

use crate::logging::SEQUENCE_CHECK;
use crate::rules::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapKind {
    /// Numbers skipped, e.g. 3 followed by 6. Probably missed detections.
    ForwardGap,
    /// A number not greater than its predecessor. Often an OCR misread.
    Reverse,
    /// A step larger than the large-jump threshold. Usually a new section.
    LargeJump,
}

/// One irregular step in a sequence of question numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceGap {
    pub before: i64,
    pub after: i64,
    pub kind: GapKind,
    pub inferred_missing: Vec<i64>,
    /// For reversals, the value the misread number most likely had.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<i64>,
}

/// Audit question numbers given in reading order, with the default
/// large-jump threshold.
pub fn check_continuity(numbers: &[i64]) -> Vec<SequenceGap> {
    check_continuity_with(numbers, Thresholds::default().large_jump)
}

/// Forward gaps listing more missing numbers than this are reported as large
/// jumps, whatever the configured threshold.
pub const MAX_INFERRED_MISSING: i64 = 1000;

/// Audit question numbers given in reading order.
///
/// Each step is measured from the last number accepted into the sequence. A
/// reversed number is reported but does not become the new reference, so a
/// single misread (`294, 204, 295`) yields one gap instead of two. The
/// exception is a reversal that the following number continues (`.., 12, 1,
/// 2`): that is a restart and the sequence resumes from it.
pub fn check_continuity_with(numbers: &[i64], large_jump: i64) -> Vec<SequenceGap> {
    let mut gaps = Vec::new();
    let Some((&first, rest)) = numbers.split_first() else {
        return gaps;
    };
    let large_jump = large_jump.min(MAX_INFERRED_MISSING);

    let mut last = first;
    for (i, &current) in rest.iter().enumerate() {
        // A step too wide for i64 is a reversal or a jump by its sign.
        let kind = match current.checked_sub(last) {
            Some(1) => {
                last = current;
                continue;
            }
            Some(delta) if delta <= 0 => GapKind::Reverse,
            Some(delta) if delta > large_jump => GapKind::LargeJump,
            Some(_) => GapKind::ForwardGap,
            None if current < last => GapKind::Reverse,
            None => GapKind::LargeJump,
        };

        let (inferred_missing, suggested_value) = match kind {
            GapKind::Reverse => (Vec::new(), Some(last.saturating_add(1))),
            GapKind::ForwardGap => ((last + 1..current).collect(), None),
            GapKind::LargeJump => (Vec::new(), None),
        };
        gaps.push(SequenceGap {
            before: last,
            after: current,
            kind,
            inferred_missing,
            suggested_value,
        });

        let restarts = current
            .checked_add(1)
            .is_some_and(|next| rest.get(i + 1) == Some(&next));
        if kind != GapKind::Reverse || restarts {
            last = current;
        }
    }

    debug!(target: SEQUENCE_CHECK, numbers = numbers.len(), gaps = gaps.len(), "checked continuity");
    gaps
}

/// Whether a gap looks like a single misread digit: a reversal between two
/// numbers of equal length differing in exactly one position (2/9, 1/7, 3/8).
/// Advisory only; nothing is corrected.
pub fn is_likely_ocr_error(gap: &SequenceGap) -> bool {
    if gap.kind != GapKind::Reverse {
        return false;
    }
    let before = gap.before.to_string();
    let after = gap.after.to_string();
    matches!(hamming(&before, &after), Ok(1))
}

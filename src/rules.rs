use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunable constants of the engine. The defaults are calibrated for worksheet
/// scans at roughly 150-300 dpi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A forward step larger than this is a section break, not an omission.
    pub large_jump: i64,
    /// Loose elements at most this far from their group are `High` confidence.
    pub high_confidence_px: i64,
    /// Loose elements at most this far from their group are `Medium` confidence.
    pub medium_confidence_px: i64,
    /// Candidate groups whose Y distance differs by no more than this are tied.
    pub tie_epsilon_px: i64,
    pub min_column_gap_px: i32,
    pub max_column_gap_px: i32,
    /// Column gap threshold as a fraction of the page width.
    pub column_gap_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            large_jump: 10,
            high_confidence_px: 500,
            medium_confidence_px: 1000,
            tie_epsilon_px: 0,
            min_column_gap_px: 50,
            max_column_gap_px: 800,
            column_gap_ratio: 0.1,
        }
    }
}

/// The strategy record that parameterizes one structuring run: which classes
/// bound groups and at which level, which are dropped, and which are visual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuringRules {
    /// Anchor classes grouped into levels, coarsest first.
    pub anchor_levels: Vec<BTreeSet<String>>,
    pub discard_classes: BTreeSet<String>,
    /// Classes described by the AI service rather than read by OCR. They are
    /// attached to groups by position instead of being grouped as children.
    pub visual_classes: BTreeSet<String>,
    /// Anchor classes identified by their text content rather than a number.
    pub content_identified_classes: BTreeSet<String>,
    /// Anchor classes whose numbers are audited for gaps and reversals.
    pub sequence_classes: BTreeSet<String>,
    pub thresholds: Thresholds,
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for StructuringRules {
    fn default() -> Self {
        Self::worksheet()
    }
}

impl StructuringRules {
    /// Rules for question worksheets: unit > question_type > question_number >
    /// second_question_number > third_question_number.
    pub fn worksheet() -> Self {
        Self {
            anchor_levels: vec![
                set(&["unit"]),
                set(&["question_type"]),
                set(&["question_number"]),
                set(&["second_question_number"]),
                set(&["third_question_number"]),
            ],
            discard_classes: set(&["page", "blank", "discard"]),
            visual_classes: set(&["figure", "table", "flowchart"]),
            content_identified_classes: set(&["question_type"]),
            sequence_classes: set(&["question_number"]),
            thresholds: Thresholds::default(),
        }
    }

    /// Rules for plain documents: no anchors, everything in Y/X reading order.
    pub fn reading_order() -> Self {
        Self {
            anchor_levels: Vec::new(),
            content_identified_classes: BTreeSet::new(),
            sequence_classes: BTreeSet::new(),
            ..Self::worksheet()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Level of an anchor class (0 is coarsest), or `None` for non-anchors.
    pub fn anchor_level(&self, class_name: &str) -> Option<usize> {
        self.anchor_levels
            .iter()
            .position(|level| level.contains(class_name))
    }

    pub fn is_anchor(&self, class_name: &str) -> bool {
        self.anchor_level(class_name).is_some()
    }

    pub fn is_discarded(&self, class_name: &str) -> bool {
        self.discard_classes.contains(class_name)
    }

    pub fn is_visual(&self, class_name: &str) -> bool {
        self.visual_classes.contains(class_name)
    }
}

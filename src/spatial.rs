use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::element::{DetectedElement, ElementId};
use crate::layout::QuestionGroup;
use crate::logging::SPATIAL_ASSIGNMENT;
use crate::rules::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    Unknown,
}

/// Which question a loose visual element (figure, table, AI description)
/// was attached to, and how sure we are about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAssignment {
    pub ai_element_id: ElementId,
    pub assigned_anchor_id: Option<ElementId>,
    /// Identifier of the owning group (its question number, when it has one).
    pub assigned_question_id: Option<String>,
    pub distance_px: Option<i64>,
    pub confidence_tier: ConfidenceTier,
}

pub fn confidence_tier(distance_px: Option<i64>, thresholds: &Thresholds) -> ConfidenceTier {
    match distance_px {
        None => ConfidenceTier::Unknown,
        Some(d) if d <= thresholds.high_confidence_px => ConfidenceTier::High,
        Some(d) if d <= thresholds.medium_confidence_px => ConfidenceTier::Medium,
        Some(_) => ConfidenceTier::Low,
    }
}

/// Attach each loose element to the anchored group (at any nesting depth)
/// whose anchor is closest in Y. Candidates within `tie_epsilon_px` of the
/// best Y distance are separated by Euclidean center distance, then by
/// anchor id. With no anchored groups every assignment is `Unknown`.
pub fn assign_loose_elements(
    loose: &[DetectedElement],
    groups: &[QuestionGroup],
    thresholds: &Thresholds,
) -> Vec<AiAssignment> {
    let candidates: Vec<(&QuestionGroup, &DetectedElement)> = groups
        .iter()
        .flat_map(QuestionGroup::iter)
        .filter_map(|g| g.anchor.as_ref().map(|a| (g, a)))
        .collect();

    let assignments: Vec<AiAssignment> = loose
        .iter()
        .map(|element| assign_one(element, &candidates, thresholds))
        .collect();

    debug!(
        target: SPATIAL_ASSIGNMENT,
        loose = loose.len(),
        candidates = candidates.len(),
        "assigned loose elements"
    );
    assignments
}

fn assign_one(
    element: &DetectedElement,
    candidates: &[(&QuestionGroup, &DetectedElement)],
    thresholds: &Thresholds,
) -> AiAssignment {
    let best_distance = candidates
        .iter()
        .map(|(_, anchor)| element.bbox.y_distance(&anchor.bbox))
        .min();

    let winner = best_distance.and_then(|best| {
        candidates
            .iter()
            .filter(|(_, anchor)| {
                element.bbox.y_distance(&anchor.bbox) <= best + thresholds.tie_epsilon_px
            })
            .min_by_key(|(_, anchor)| {
                (
                    OrderedFloat(element.bbox.center_distance(&anchor.bbox)),
                    anchor.id,
                )
            })
    });

    let assignment = match winner {
        Some((group, anchor)) => {
            let distance = element.bbox.y_distance(&anchor.bbox);
            AiAssignment {
                ai_element_id: element.id,
                assigned_anchor_id: Some(anchor.id),
                assigned_question_id: group.identifier.clone(),
                distance_px: Some(distance),
                confidence_tier: confidence_tier(Some(distance), thresholds),
            }
        }
        None => AiAssignment {
            ai_element_id: element.id,
            assigned_anchor_id: None,
            assigned_question_id: None,
            distance_px: None,
            confidence_tier: ConfidenceTier::Unknown,
        },
    };

    trace!(
        target: SPATIAL_ASSIGNMENT,
        element = %element.id,
        anchor = ?assignment.assigned_anchor_id,
        distance = ?assignment.distance_px,
        tier = ?assignment.confidence_tier,
        "assigned loose element"
    );
    assignment
}

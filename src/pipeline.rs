use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info_span, warn};

use crate::anomaly::Anomaly;
use crate::columns::{column_index_for, partition_columns, ColumnRange};
use crate::element::{reading_order, DetectedElement, ElementId, PageInput};
use crate::layout::{build_groups, QuestionGroup};
use crate::logging::PIPELINE;
use crate::matcher::extract_number;
use crate::rules::StructuringRules;
use crate::sequence::{check_continuity_with, is_likely_ocr_error};
use crate::spatial::{assign_loose_elements, AiAssignment};

/// The groups of one reading column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredColumn {
    pub column: ColumnRange,
    pub groups: Vec<QuestionGroup>,
    /// Children outside every group, in reading order.
    pub unassigned: Vec<DetectedElement>,
}

/// A page reconstructed into reading order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredPage {
    pub page_number: u32,
    pub page_width: i32,
    /// Columns left to right, each read top to bottom.
    pub columns: Vec<StructuredColumn>,
    /// Visual and AI-described elements, placed via `assignments`.
    pub loose: Vec<DetectedElement>,
    pub assignments: Vec<AiAssignment>,
    pub anomalies: Vec<Anomaly>,
}

impl StructuredPage {
    /// Every group on the page, nested ones included, in reading order.
    pub fn groups(&self) -> impl Iterator<Item = &QuestionGroup> {
        self.columns
            .iter()
            .flat_map(|c| c.groups.iter())
            .flat_map(QuestionGroup::iter)
    }

    pub fn assignment_for(&self, element: ElementId) -> Option<&AiAssignment> {
        self.assignments.iter().find(|a| a.ai_element_id == element)
    }

    /// Loose elements assigned to the given anchor, in reading order.
    pub fn visuals_for(&self, anchor: ElementId) -> impl Iterator<Item = &DetectedElement> {
        self.loose.iter().filter(move |e| {
            self.assignment_for(e.id)
                .is_some_and(|a| a.assigned_anchor_id == Some(anchor))
        })
    }
}

/// Structure the detections of one page.
///
/// Runs column detection, per-column grouping, a continuity audit of the
/// question numbers across all columns, and the spatial assignment of loose
/// visual elements. Never fails: problems are reported in
/// [`StructuredPage::anomalies`].
pub fn structure_page(
    elements: &[DetectedElement],
    rules: &StructuringRules,
    page_width: i32,
) -> StructuredPage {
    structure(0, elements, rules, page_width, None)
}

/// [`structure_page`] for a page record, honouring its page number and height.
pub fn structure_page_input(page: &PageInput, rules: &StructuringRules) -> StructuredPage {
    structure(
        page.page_number,
        &page.elements,
        rules,
        page.page_width,
        page.page_height,
    )
}

/// Structure independent pages in parallel. Output order follows input order.
pub fn structure_document(pages: &[PageInput], rules: &StructuringRules) -> Vec<StructuredPage> {
    pages
        .par_iter()
        .map(|page| structure_page_input(page, rules))
        .collect()
}

fn structure(
    page_number: u32,
    elements: &[DetectedElement],
    rules: &StructuringRules,
    page_width: i32,
    page_height: Option<i32>,
) -> StructuredPage {
    let _span = info_span!(target: PIPELINE, "structure_page", page = page_number).entered();
    let mut anomalies = Vec::new();

    let page_width = if page_width > 0 {
        page_width
    } else {
        let inferred = elements.iter().map(|e| e.bbox.right()).max().unwrap_or(1).max(1);
        warn!(target: PIPELINE, declared = page_width, inferred, "unusable page width");
        anomalies.push(Anomaly::InvalidPageWidth {
            declared: page_width,
            inferred,
        });
        inferred
    };

    let kept: Vec<&DetectedElement> = elements
        .iter()
        .filter(|e| !rules.is_discarded(&e.class_name))
        .collect();

    let anchor_positions: IndexMap<ElementId, (i32, i32)> = kept
        .iter()
        .filter(|e| rules.is_anchor(&e.class_name))
        .map(|e| (e.id, (e.x_position(), e.y_position())))
        .collect();
    let columns = partition_columns(&anchor_positions, page_width, &rules.thresholds);

    let mut anchored = vec![false; columns.len()];
    for &(x, _) in anchor_positions.values() {
        anchored[column_index_for(&columns, x)] = true;
    }

    // Visuals are placed by proximity only where there are anchors to place
    // them against. In a column without anchors they are read in Y/X order
    // like everything else.
    let mut loose: Vec<&DetectedElement> = Vec::new();
    let mut per_column: Vec<Vec<DetectedElement>> = vec![Vec::new(); columns.len()];
    for element in kept {
        let index = column_index_for(&columns, element.x_position());
        let is_loose = !rules.is_anchor(&element.class_name)
            && (rules.is_visual(&element.class_name) || element.has_ai_description());
        if is_loose && anchored[index] {
            loose.push(element);
        } else {
            per_column[index].push(element.clone());
        }
    }
    loose.sort_by(|a, b| reading_order(a, b));

    let bottom = page_height.unwrap_or(0);
    let mut structured_columns = Vec::with_capacity(columns.len());
    for (column, column_elements) in columns.iter().zip(&per_column) {
        // Elements hanging over the page edge still belong to the edge column.
        let min_x = column_elements
            .iter()
            .map(|e| e.x_position())
            .min()
            .unwrap_or(column.start_x);
        let max_x = column_elements
            .iter()
            .map(|e| e.x_position().saturating_add(1))
            .max()
            .unwrap_or(column.end_x);
        let admitted = column.widened(min_x, max_x);

        let outcome = build_groups(column_elements, rules, &admitted, bottom);
        anomalies.extend(outcome.anomalies);
        structured_columns.push(StructuredColumn {
            column: *column,
            groups: outcome.groups,
            unassigned: outcome.unassigned,
        });
    }

    let mut page = StructuredPage {
        page_number,
        page_width,
        columns: structured_columns,
        loose: loose.into_iter().cloned().collect(),
        assignments: Vec::new(),
        anomalies,
    };

    audit_sequences(&mut page, rules);
    assign_visuals(&mut page, rules);

    debug!(
        target: PIPELINE,
        columns = page.columns.len(),
        groups = page.groups().count(),
        loose = page.loose.len(),
        anomalies = page.anomalies.len(),
        "structured page"
    );
    page
}

fn audit_sequences(page: &mut StructuredPage, rules: &StructuringRules) {
    let mut found = Vec::new();
    for class in &rules.sequence_classes {
        let numbers: Vec<i64> = page
            .groups()
            .filter(|g| g.anchor_class() == Some(class.as_str()))
            .filter_map(|g| g.anchor.as_ref().and_then(|a| a.content()))
            .filter_map(extract_number)
            .collect();

        for gap in check_continuity_with(&numbers, rules.thresholds.large_jump) {
            if is_likely_ocr_error(&gap) {
                warn!(
                    target: PIPELINE,
                    class = %class,
                    before = gap.before,
                    after = gap.after,
                    "question number looks misread"
                );
                found.push(Anomaly::OcrSuspicion {
                    anchor_class: class.clone(),
                    before: gap.before,
                    after: gap.after,
                    suggested_value: gap
                        .suggested_value
                        .unwrap_or(gap.before.saturating_add(1)),
                });
            }
            found.push(Anomaly::SequenceGap {
                anchor_class: class.clone(),
                gap,
            });
        }
    }
    page.anomalies.extend(found);
}

/// Loose elements only exist in columns with anchors and are matched
/// against the groups of their own column.
fn assign_visuals(page: &mut StructuredPage, rules: &StructuringRules) {
    let columns: Vec<ColumnRange> = page.columns.iter().map(|c| c.column).collect();
    let assignments: Vec<AiAssignment> = page
        .loose
        .iter()
        .flat_map(|element| {
            let column = &page.columns[column_index_for(&columns, element.x_position())];
            assign_loose_elements(
                std::slice::from_ref(element),
                &column.groups,
                &rules.thresholds,
            )
        })
        .collect();
    page.assignments = assignments;
}

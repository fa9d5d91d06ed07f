//! Anchor/child grouping.
//!
//! Anchors are detections whose class bounds a group (units, question types,
//! question numbers and their sub-numbers). Within one column they are read
//! top to bottom; an anchor's group runs from its own Y position to the next
//! anchor of the same or a coarser level. Finer anchors inside that range
//! become nested groups, and every other detection is attached to the
//! innermost group whose range contains its Y position.

use rstar::{RTree, RTreeObject, AABB};
use serde::Serialize;
use tracing::{debug, debug_span, warn};

use crate::anomaly::Anomaly;
use crate::columns::ColumnRange;
use crate::element::{reading_order, DetectedElement, ElementId};
use crate::logging::GROUPING;
use crate::matcher::{extract_identifier, generate_identifier};
use crate::rules::StructuringRules;

/// A group opened by one anchor, with the detections that belong to it.
///
/// `anchor` is `None` only for the implicit group produced when a column has
/// no anchors at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionGroup {
    pub anchor: Option<DetectedElement>,
    /// Anchor level, 0 being the coarsest.
    pub level: Option<usize>,
    pub identifier: Option<String>,
    pub start_y: i32,
    pub end_y: i32,
    pub children: Vec<DetectedElement>,
    pub nested_groups: Vec<QuestionGroup>,
}

impl QuestionGroup {
    pub fn anchor_element_id(&self) -> Option<ElementId> {
        self.anchor.as_ref().map(|a| a.id)
    }

    pub fn anchor_class(&self) -> Option<&str> {
        self.anchor.as_ref().map(|a| a.class_name.as_str())
    }

    /// Number of directly assigned children. Nested groups are not counted.
    pub fn element_count(&self) -> usize {
        self.children.len()
    }

    pub fn contains_y(&self, y: i32) -> bool {
        self.start_y <= y && y < self.end_y
    }

    /// This group and all nested groups, depth first in reading order.
    pub fn iter(&self) -> GroupIter<'_> {
        GroupIter { stack: vec![self] }
    }
}

pub struct GroupIter<'a> {
    stack: Vec<&'a QuestionGroup>,
}

impl<'a> Iterator for GroupIter<'a> {
    type Item = &'a QuestionGroup;

    fn next(&mut self) -> Option<Self::Item> {
        let group = self.stack.pop()?;
        self.stack.extend(group.nested_groups.iter().rev());
        Some(group)
    }
}

/// Groups of one column plus what could not be placed in them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupingOutcome {
    pub groups: Vec<QuestionGroup>,
    pub unassigned: Vec<DetectedElement>,
    pub anomalies: Vec<Anomaly>,
}

/// Working state for one anchor while the tree is assembled.
struct AnchorNode<'a> {
    element: &'a DetectedElement,
    level: usize,
    depth: usize,
    start_y: i32,
    end_y: i32,
    nested: Vec<usize>,
    children: Vec<&'a DetectedElement>,
}

/// Y range of one anchor node, indexed for point queries.
struct GroupSpan {
    node: usize,
    depth: usize,
    start_y: i32,
    end_y: i32,
}

impl RTreeObject for GroupSpan {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        // Half-open [start_y, end_y) on integer pixels is [start_y, end_y - 1].
        AABB::from_corners(
            [0.0, f64::from(self.start_y)],
            [0.0, f64::from(self.end_y) - 1.0],
        )
    }
}

/// Build the group tree for the elements of one column.
///
/// `bottom` is the lower bound of the column; the last anchor's group runs to
/// it. It is raised to the lowest element bottom if that lies further down.
/// Discarded classes are ignored, anchors become groups and every other
/// element is a child.
pub fn build_groups(
    elements: &[DetectedElement],
    rules: &StructuringRules,
    column: &ColumnRange,
    bottom: i32,
) -> GroupingOutcome {
    let _span = debug_span!(target: GROUPING, "build_groups", column = column.index).entered();

    let in_column: Vec<&DetectedElement> = elements
        .iter()
        .filter(|e| column.contains_x(e.x_position()))
        .filter(|e| !rules.is_discarded(&e.class_name))
        .collect();

    let bottom = in_column
        .iter()
        .map(|e| e.bbox.bottom())
        .fold(bottom, i32::max);

    let mut anchors: Vec<(&DetectedElement, usize)> = Vec::new();
    let mut children: Vec<&DetectedElement> = Vec::new();
    for element in in_column {
        match rules.anchor_level(&element.class_name) {
            Some(level) => anchors.push((element, level)),
            None => children.push(element),
        }
    }
    anchors.sort_by(|a, b| reading_order(a.0, b.0));
    children.sort_by(|a, b| reading_order(a, b));

    let mut outcome = GroupingOutcome::default();

    if anchors.is_empty() {
        let top = children.iter().map(|c| c.y_position()).fold(0, i32::min);
        debug!(target: GROUPING, children = children.len(), "no anchors, using reading order");
        if !children.is_empty() {
            outcome.groups.push(QuestionGroup {
                anchor: None,
                level: None,
                identifier: None,
                start_y: top,
                end_y: bottom,
                children: children.into_iter().cloned().collect(),
                nested_groups: Vec::new(),
            });
        }
        return outcome;
    }

    for pair in anchors.windows(2) {
        let (first, second) = (pair[0].0, pair[1].0);
        if first.x_position() == second.x_position() && first.y_position() == second.y_position()
        {
            warn!(
                target: GROUPING,
                first = %first.id,
                duplicate = %second.id,
                x = first.x_position(),
                y = first.y_position(),
                "duplicate anchors at identical coordinates"
            );
            outcome.anomalies.push(Anomaly::DuplicateAnchor {
                first: first.id,
                duplicate: second.id,
                x: first.x_position(),
                y: first.y_position(),
            });
        }
    }

    let mut nodes: Vec<AnchorNode> = anchors
        .iter()
        .enumerate()
        .map(|(i, &(element, level))| {
            let end_y = anchors[i + 1..]
                .iter()
                .find(|(_, next_level)| *next_level <= level)
                .map(|(next, _)| next.y_position())
                .unwrap_or(bottom);
            AnchorNode {
                element,
                level,
                depth: 0,
                start_y: element.y_position(),
                end_y,
                nested: Vec::new(),
                children: Vec::new(),
            }
        })
        .collect();

    let mut roots: Vec<usize> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    for i in 0..nodes.len() {
        while let Some(&top) = open.last() {
            if nodes[top].level >= nodes[i].level || nodes[top].end_y <= nodes[i].start_y {
                open.pop();
            } else {
                break;
            }
        }
        nodes[i].depth = open.len();
        match open.last() {
            Some(&parent) => nodes[parent].nested.push(i),
            None => roots.push(i),
        }
        open.push(i);
    }

    let spans = RTree::bulk_load(
        nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.end_y > n.start_y)
            .map(|(node, n)| GroupSpan {
                node,
                depth: n.depth,
                start_y: n.start_y,
                end_y: n.end_y,
            })
            .collect(),
    );

    for child in children {
        let y = child.y_position();
        let owner = spans
            .locate_in_envelope_intersecting(&AABB::from_point([0.0, f64::from(y)]))
            .max_by_key(|span| (span.depth, span.start_y, span.node))
            .map(|span| span.node);
        match owner {
            Some(node) => nodes[node].children.push(child),
            None => {
                warn!(
                    target: GROUPING,
                    element = %child.id,
                    y,
                    column = column.index,
                    "child outside every group"
                );
                outcome.anomalies.push(Anomaly::UnassignedChild {
                    element_id: child.id,
                    column: column.index,
                    y_position: y,
                });
                outcome.unassigned.push(child.clone());
            }
        }
    }

    outcome.groups = roots
        .iter()
        .map(|&root| materialize(&nodes, root, rules))
        .collect();

    debug!(
        target: GROUPING,
        anchors = nodes.len(),
        roots = outcome.groups.len(),
        unassigned = outcome.unassigned.len(),
        "built groups"
    );
    outcome
}

fn materialize(nodes: &[AnchorNode], index: usize, rules: &StructuringRules) -> QuestionGroup {
    let node = &nodes[index];
    let mut children: Vec<DetectedElement> = node.children.iter().map(|&c| c.clone()).collect();
    children.sort_by(reading_order);

    QuestionGroup {
        anchor: Some(node.element.clone()),
        level: Some(node.level),
        identifier: anchor_identifier(node.element, rules),
        start_y: node.start_y,
        end_y: node.end_y,
        children,
        nested_groups: node
            .nested
            .iter()
            .map(|&n| materialize(nodes, n, rules))
            .collect(),
    }
}

/// Identifier of an anchor: its question number, or a content-derived id for
/// classes such as `question_type`.
pub fn anchor_identifier(anchor: &DetectedElement, rules: &StructuringRules) -> Option<String> {
    let text = anchor.content()?;
    if rules.content_identified_classes.contains(&anchor.class_name) {
        generate_identifier(anchor.id.0, text).ok()
    } else {
        extract_identifier(text)
    }
}

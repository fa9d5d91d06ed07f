use docgroup::{build_groups, Anomaly, ColumnRange, QuestionGroup, StructuringRules};
use pretty_assertions::assert_eq;

mod common;
use common::{ids, PageBuilder};

const FULL: ColumnRange = ColumnRange {
    index: 0,
    start_x: 0,
    end_x: 1000,
};

fn assert_children_within(group: &QuestionGroup) {
    for child in &group.children {
        assert!(
            group.contains_y(child.y_position()),
            "child {} at y={} outside [{}, {})",
            child.id,
            child.y_position(),
            group.start_y,
            group.end_y
        );
    }
    for nested in &group.nested_groups {
        assert!(nested.start_y >= group.start_y && nested.end_y <= group.end_y);
        assert_children_within(nested);
    }
}

#[test]
fn test_children_follow_their_anchor() {
    let mut page = PageBuilder::new();
    let q1 = page.add_text("question_number", 50, 100, "1.");
    let a = page.add_text("question_text", 90, 150, "첫 번째 문제");
    let b = page.add_text("choice", 90, 200, "① 가");
    let q2 = page.add_text("question_number", 50, 400, "2.");
    let c = page.add_text("question_text", 90, 450, "두 번째 문제");

    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &FULL, 0);

    assert!(outcome.anomalies.is_empty());
    assert!(outcome.unassigned.is_empty());
    assert_eq!(outcome.groups.len(), 2);

    let first = &outcome.groups[0];
    assert_eq!(first.anchor_element_id(), Some(q1));
    assert_eq!(first.identifier.as_deref(), Some("1"));
    assert_eq!((first.start_y, first.end_y), (100, 400));
    assert_eq!(ids(&first.children), vec![a, b]);
    assert_eq!(first.element_count(), 2);

    let second = &outcome.groups[1];
    assert_eq!(second.anchor_element_id(), Some(q2));
    assert_eq!((second.start_y, second.end_y), (400, 480));
    assert_eq!(ids(&second.children), vec![c]);

    outcome.groups.iter().for_each(assert_children_within);
}

#[test]
fn test_nested_anchor_levels() {
    let mut page = PageBuilder::new();
    let unit = page.add_text("unit", 40, 50, "1단원");
    let q1 = page.add_text("question_number", 50, 100, "1.");
    let q1_text = page.add_text("question_text", 90, 120, "물음에 답하시오");
    let sub1 = page.add_text("second_question_number", 70, 150, "(1)");
    let sub1_text = page.add_text("question_text", 110, 170, "가");
    let sub2 = page.add_text("second_question_number", 70, 250, "(2)");
    let sub2_text = page.add_text("question_text", 110, 260, "나");
    let q2 = page.add_text("question_number", 50, 400, "2.");
    let q2_text = page.add_text("question_text", 90, 410, "다");

    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &FULL, 1200);

    assert_eq!(outcome.groups.len(), 1);
    let unit_group = &outcome.groups[0];
    assert_eq!(unit_group.anchor_element_id(), Some(unit));
    assert_eq!(unit_group.level, Some(0));
    assert_eq!((unit_group.start_y, unit_group.end_y), (50, 1200));
    assert_eq!(unit_group.element_count(), 0);

    let questions: Vec<_> = unit_group
        .nested_groups
        .iter()
        .map(|g| g.anchor_element_id())
        .collect();
    assert_eq!(questions, vec![Some(q1), Some(q2)]);

    let first = &unit_group.nested_groups[0];
    assert_eq!((first.start_y, first.end_y), (100, 400));
    assert_eq!(ids(&first.children), vec![q1_text]);
    assert_eq!(first.nested_groups.len(), 2);

    let (one, two) = (&first.nested_groups[0], &first.nested_groups[1]);
    assert_eq!(one.anchor_element_id(), Some(sub1));
    assert_eq!(one.identifier.as_deref(), Some("1"));
    assert_eq!((one.start_y, one.end_y), (150, 250));
    assert_eq!(ids(&one.children), vec![sub1_text]);
    assert_eq!(two.anchor_element_id(), Some(sub2));
    assert_eq!((two.start_y, two.end_y), (250, 400));
    assert_eq!(ids(&two.children), vec![sub2_text]);

    assert_eq!(ids(&unit_group.nested_groups[1].children), vec![q2_text]);
    outcome.groups.iter().for_each(assert_children_within);

    let walk: Vec<_> = unit_group.iter().map(|g| g.anchor_element_id()).collect();
    assert_eq!(
        walk,
        vec![Some(unit), Some(q1), Some(sub1), Some(sub2), Some(q2)]
    );
}

#[test]
fn test_content_above_first_anchor_is_reported() {
    let mut page = PageBuilder::new();
    let header = page.add_text("title", 50, 20, "중간고사");
    page.add_text("question_number", 50, 100, "1.");

    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &FULL, 0);

    assert_eq!(ids(&outcome.unassigned), vec![header]);
    assert_eq!(
        outcome.anomalies,
        vec![Anomaly::UnassignedChild {
            element_id: header,
            column: 0,
            y_position: 20,
        }]
    );
}

#[test]
fn test_no_anchors_falls_back_to_reading_order() {
    let mut page = PageBuilder::new();
    let c = page.add_text("plain_text", 50, 300, "c");
    let b = page.add_text("plain_text", 400, 100, "b");
    let a = page.add_text("plain_text", 50, 100, "a");
    let d = page.add_text("plain_text", 50, 500, "d");

    let outcome = build_groups(&page.elements(), &StructuringRules::reading_order(), &FULL, 0);

    assert_eq!(outcome.groups.len(), 1);
    let group = &outcome.groups[0];
    assert_eq!(group.anchor, None);
    assert_eq!(ids(&group.children), vec![a, b, c, d]);
    assert_children_within(group);
}

#[test]
fn test_anchor_classes_without_anchors_on_page() {
    let mut page = PageBuilder::new();
    let a = page.add_text("plain_text", 50, 100, "a");

    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &FULL, 0);

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].anchor, None);
    assert_eq!(ids(&outcome.groups[0].children), vec![a]);
}

#[test]
fn test_empty_column_has_no_groups() {
    let outcome = build_groups(&[], &StructuringRules::worksheet(), &FULL, 0);
    assert!(outcome.groups.is_empty());
    assert!(outcome.unassigned.is_empty());
}

#[test]
fn test_duplicate_anchors_are_reported_not_fatal() {
    let mut page = PageBuilder::new();
    let first = page.add_text("question_number", 50, 100, "1.");
    let duplicate = page.add_text("question_number", 50, 100, "1.");
    let child = page.add_text("question_text", 90, 150, "본문");

    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &FULL, 0);

    assert_eq!(
        outcome.anomalies,
        vec![Anomaly::DuplicateAnchor {
            first,
            duplicate,
            x: 50,
            y: 100,
        }]
    );
    assert_eq!(outcome.groups.len(), 2);
    assert!(outcome.groups[0].children.is_empty());
    assert_eq!(outcome.groups[1].anchor_element_id(), Some(duplicate));
    assert_eq!(ids(&outcome.groups[1].children), vec![child]);
}

#[test]
fn test_only_elements_in_column_are_grouped() {
    let mut page = PageBuilder::new();
    let q1 = page.add_text("question_number", 50, 100, "1.");
    let inside = page.add_text("question_text", 90, 150, "왼쪽");
    page.add_text("question_number", 550, 100, "5.");
    page.add_text("question_text", 590, 150, "오른쪽");

    let left = ColumnRange {
        index: 0,
        start_x: 0,
        end_x: 310,
    };
    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &left, 0);

    assert_eq!(outcome.groups.len(), 1);
    assert_eq!(outcome.groups[0].anchor_element_id(), Some(q1));
    assert_eq!(ids(&outcome.groups[0].children), vec![inside]);
}

#[test]
fn test_discarded_classes_are_ignored() {
    let mut page = PageBuilder::new();
    page.add("page", 0, 0);
    page.add_text("question_number", 50, 100, "1.");
    page.add("blank", 90, 130);
    let text = page.add_text("question_text", 90, 150, "본문");

    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &FULL, 0);

    assert!(outcome.unassigned.is_empty());
    assert_eq!(ids(&outcome.groups[0].children), vec![text]);
}

#[test]
fn test_question_type_gets_content_identifier() {
    let mut page = PageBuilder::new();
    let header = page.add_text("question_type", 40, 60, "다음 물음에 답하시오.");
    page.add_text("question_number", 50, 100, "3.");

    let outcome = build_groups(&page.elements(), &StructuringRules::worksheet(), &FULL, 0);

    let group = &outcome.groups[0];
    assert_eq!(
        group.identifier,
        Some(format!("type_{}_다음_물음에_답하시오", header))
    );
    assert_eq!(group.nested_groups[0].identifier.as_deref(), Some("3"));
}

//! Flattening of a structured page into an ordered stream of tagged items,
//! the form consumed by text formatters and exporters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::{DetectedElement, ElementId};
use crate::layout::QuestionGroup;
use crate::pipeline::StructuredPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTag {
    ColumnStart,
    GroupStart,
    Element,
    Visual,
    GroupEnd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamItem {
    pub depth: usize,
    pub tag: StreamTag,
    pub element_id: Option<ElementId>,
    pub class_name: Option<String>,
    pub identifier: Option<String>,
    pub text: Option<String>,
}

impl StreamItem {
    fn element(depth: usize, tag: StreamTag, element: &DetectedElement) -> Self {
        Self {
            depth,
            tag,
            element_id: Some(element.id),
            class_name: Some(element.class_name.clone()),
            identifier: None,
            text: element.content().map(str::to_string),
        }
    }
}

/// Entries of one group, merged by position.
enum Entry<'a> {
    Child(&'a DetectedElement),
    Visual(&'a DetectedElement),
    Nested(&'a QuestionGroup),
}

impl Entry<'_> {
    fn sort_key(&self) -> (i32, i32, u8) {
        match self {
            Entry::Child(e) => (e.y_position(), e.x_position(), 1),
            Entry::Visual(e) => (e.y_position(), e.x_position(), 2),
            Entry::Nested(g) => (
                g.start_y,
                g.anchor.as_ref().map_or(i32::MIN, |a| a.x_position()),
                0,
            ),
        }
    }
}

struct StreamBuilder<'a> {
    visuals: HashMap<ElementId, Vec<&'a DetectedElement>>,
    items: Vec<StreamItem>,
}

impl<'a> StreamBuilder<'a> {
    fn push_group(&mut self, group: &'a QuestionGroup, depth: usize) {
        let anchored = group.anchor.is_some();
        if let Some(anchor) = &group.anchor {
            self.items.push(StreamItem {
                identifier: group.identifier.clone(),
                ..StreamItem::element(depth, StreamTag::GroupStart, anchor)
            });
        }
        let inner = if anchored { depth + 1 } else { depth };

        let mut entries: Vec<Entry<'a>> = group.children.iter().map(Entry::Child).collect();
        if let Some(id) = group.anchor_element_id() {
            if let Some(visuals) = self.visuals.remove(&id) {
                entries.extend(visuals.into_iter().map(Entry::Visual));
            }
        }
        entries.extend(group.nested_groups.iter().map(Entry::Nested));
        entries.sort_by_key(Entry::sort_key);

        for entry in entries {
            match entry {
                // Described visuals read in place in columns without anchors.
                Entry::Child(e) if e.has_ai_description() => self
                    .items
                    .push(StreamItem::element(inner, StreamTag::Visual, e)),
                Entry::Child(e) => self
                    .items
                    .push(StreamItem::element(inner, StreamTag::Element, e)),
                Entry::Visual(e) => self
                    .items
                    .push(StreamItem::element(inner, StreamTag::Visual, e)),
                Entry::Nested(g) => self.push_group(g, inner),
            }
        }

        if let Some(anchor) = &group.anchor {
            self.items.push(StreamItem {
                depth,
                tag: StreamTag::GroupEnd,
                element_id: Some(anchor.id),
                class_name: Some(anchor.class_name.clone()),
                identifier: group.identifier.clone(),
                text: None,
            });
        }
    }
}

/// Flatten a page in reading order: columns left to right, groups top to
/// bottom, each group's children, visuals and nested groups merged by
/// position. Visuals that could not be assigned come last.
pub fn to_element_stream(page: &StructuredPage) -> Vec<StreamItem> {
    let mut visuals: HashMap<ElementId, Vec<&DetectedElement>> = HashMap::new();
    let mut orphans = Vec::new();
    for element in &page.loose {
        match page
            .assignment_for(element.id)
            .and_then(|a| a.assigned_anchor_id)
        {
            Some(anchor) => visuals.entry(anchor).or_default().push(element),
            None => orphans.push(element),
        }
    }

    let mut builder = StreamBuilder {
        visuals,
        items: Vec::new(),
    };

    for column in &page.columns {
        builder.items.push(StreamItem {
            depth: 0,
            tag: StreamTag::ColumnStart,
            element_id: None,
            class_name: None,
            identifier: Some(column.column.index.to_string()),
            text: None,
        });
        for element in &column.unassigned {
            builder
                .items
                .push(StreamItem::element(1, StreamTag::Element, element));
        }
        for group in &column.groups {
            builder.push_group(group, 1);
        }
    }

    for element in orphans {
        builder
            .items
            .push(StreamItem::element(0, StreamTag::Visual, element));
    }
    builder.items
}

/// Render a stream as indented plain text with structural tags, e.g.
/// `[question_number 3]` ... `[/question_number]`.
pub fn render_text(items: &[StreamItem]) -> String {
    let mut out = String::new();
    for item in items {
        let indent = "  ".repeat(item.depth);
        let class = item.class_name.as_deref().unwrap_or("");
        let text = item.text.as_deref().unwrap_or("");
        let line = match item.tag {
            StreamTag::ColumnStart => {
                format!("[column {}]", item.identifier.as_deref().unwrap_or(""))
            }
            StreamTag::GroupStart => match &item.identifier {
                Some(id) => format!("{indent}[{class} {id}]"),
                None => format!("{indent}[{class}]"),
            },
            StreamTag::Element if text.is_empty() => continue,
            StreamTag::Element => format!("{indent}{text}"),
            StreamTag::Visual => format!("{indent}[{class}] {text}"),
            StreamTag::GroupEnd => format!("{indent}[/{class}]"),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

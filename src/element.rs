use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructureError};
use crate::geo::BoundingBox;

/// Identifier of a detection, unique within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One detection returned by the layout detector, with whatever text the OCR
/// or description services attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawElement")]
pub struct DetectedElement {
    pub id: ElementId,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_description: Option<String>,
}

#[derive(Deserialize)]
struct RawElement {
    id: ElementId,
    class_name: String,
    confidence: f32,
    bbox: BoundingBox,
    #[serde(default)]
    ocr_text: Option<String>,
    #[serde(default)]
    ai_description: Option<String>,
}

impl TryFrom<RawElement> for DetectedElement {
    type Error = StructureError;

    fn try_from(raw: RawElement) -> Result<Self> {
        let mut element = DetectedElement::new(raw.id, raw.class_name, raw.confidence, raw.bbox)?;
        element.ocr_text = raw.ocr_text;
        element.ai_description = raw.ai_description;
        Ok(element)
    }
}

impl DetectedElement {
    pub fn new(
        id: impl Into<ElementId>,
        class_name: impl Into<String>,
        confidence: f32,
        bbox: BoundingBox,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(StructureError::invalid(format!(
                "confidence {confidence} is outside [0, 1]"
            )));
        }
        let class_name = class_name.into();
        if class_name.trim().is_empty() {
            return Err(StructureError::invalid("class name is empty"));
        }
        Ok(Self {
            id: id.into(),
            class_name,
            confidence,
            bbox,
            ocr_text: None,
            ai_description: None,
        })
    }

    pub fn with_ocr_text(mut self, text: impl Into<String>) -> Self {
        self.ocr_text = Some(text.into());
        self
    }

    pub fn with_ai_description(mut self, description: impl Into<String>) -> Self {
        self.ai_description = Some(description.into());
        self
    }

    pub fn x_position(&self) -> i32 {
        self.bbox.x_position()
    }

    pub fn y_position(&self) -> i32 {
        self.bbox.y_position()
    }

    /// The primary content: OCR text for text-like classes, otherwise the AI
    /// description. Blank strings count as absent.
    pub fn content(&self) -> Option<&str> {
        self.ocr_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                self.ai_description
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
            })
    }

    pub fn has_ai_description(&self) -> bool {
        self.ai_description
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

impl From<u64> for ElementId {
    fn from(value: u64) -> Self {
        ElementId(value)
    }
}

/// Reading-order comparison: top to bottom, then left to right, then by id so
/// that shuffled input produces the same order.
pub fn reading_order(a: &DetectedElement, b: &DetectedElement) -> std::cmp::Ordering {
    a.y_position()
        .cmp(&b.y_position())
        .then_with(|| a.x_position().cmp(&b.x_position()))
        .then_with(|| a.id.cmp(&b.id))
}

/// All detections of one page as handed over by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    #[serde(default)]
    pub page_number: u32,
    pub page_width: i32,
    #[serde(default)]
    pub page_height: Option<i32>,
    pub elements: Vec<DetectedElement>,
}

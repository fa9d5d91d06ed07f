#![allow(dead_code)]

use docgroup::{BoundingBox, DetectedElement, ElementId};

pub const TEXT_WIDTH: i32 = 200;
pub const TEXT_HEIGHT: i32 = 30;

pub fn bbox(x: i32, y: i32, width: i32, height: i32) -> BoundingBox {
    BoundingBox::new(x, y, width, height).expect("test boxes are valid")
}

pub fn element(id: u64, class: &str, x: i32, y: i32) -> DetectedElement {
    DetectedElement::new(id, class, 0.9, bbox(x, y, TEXT_WIDTH, TEXT_HEIGHT))
        .expect("test elements are valid")
}

/// Builds a page of detections with sequential ids in insertion order.
#[derive(Default)]
pub struct PageBuilder {
    next_id: u64,
    elements: Vec<DetectedElement>,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            elements: Vec::new(),
        }
    }

    fn push(&mut self, element: DetectedElement) -> ElementId {
        let id = element.id;
        self.elements.push(element);
        id
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// An element with no text.
    pub fn add(&mut self, class: &str, x: i32, y: i32) -> ElementId {
        let id = self.take_id();
        self.push(element(id, class, x, y))
    }

    /// An OCR-read element.
    pub fn add_text(&mut self, class: &str, x: i32, y: i32, text: &str) -> ElementId {
        let id = self.take_id();
        self.push(element(id, class, x, y).with_ocr_text(text))
    }

    /// A visual element described by the AI service.
    pub fn add_visual(&mut self, class: &str, x: i32, y: i32, description: &str) -> ElementId {
        let id = self.take_id();
        let visual = DetectedElement::new(id, class, 0.8, bbox(x, y, 300, 200))
            .expect("test elements are valid")
            .with_ai_description(description);
        self.push(visual)
    }

    pub fn elements(&self) -> Vec<DetectedElement> {
        self.elements.clone()
    }
}

/// Ids of elements in order.
pub fn ids(elements: &[DetectedElement]) -> Vec<ElementId> {
    elements.iter().map(|e| e.id).collect()
}

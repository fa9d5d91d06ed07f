//! Reconstruction of ordered, hierarchical documents from layout detections.
//!
//! A layout detector returns an unordered bag of boxes (class, confidence,
//! bbox) with OCR text or AI-generated descriptions attached. This crate turns
//! one page of those into columns of question groups in reading order,
//! audits the question numbering and attaches figures and tables to the
//! questions they belong to.

pub mod anomaly;
pub mod columns;
pub mod element;
pub mod error;
pub mod geo;
pub mod layout;
pub mod logging;
pub mod matcher;
pub mod pipeline;
pub mod rules;
pub mod sequence;
pub mod spatial;
pub mod stream;

pub use anomaly::Anomaly;
pub use columns::{detect_columns, ColumnRange};
pub use element::{DetectedElement, ElementId, PageInput};
pub use error::{Result, StructureError};
pub use geo::BoundingBox;
pub use layout::{build_groups, QuestionGroup};
pub use matcher::{extract_identifier, generate_identifier, normalize};
pub use pipeline::{
    structure_document, structure_page, structure_page_input, StructuredColumn, StructuredPage,
};
pub use rules::{StructuringRules, Thresholds};
pub use sequence::{check_continuity, is_likely_ocr_error, GapKind, SequenceGap};
pub use spatial::{assign_loose_elements, AiAssignment, ConfidenceTier};
pub use stream::{render_text, to_element_stream, StreamItem, StreamTag};


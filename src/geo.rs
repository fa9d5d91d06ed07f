use serde::{Deserialize, Serialize};

use crate::error::{Result, StructureError};

/// Axis-aligned box in page-pixel space, origin at the top-left corner.
///
/// Width and height are always positive. `x_position`, `y_position` and
/// `area` are derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBox")]
pub struct BoundingBox {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

#[derive(Deserialize)]
struct RawBox {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl TryFrom<RawBox> for BoundingBox {
    type Error = StructureError;

    fn try_from(raw: RawBox) -> Result<Self> {
        BoundingBox::new(raw.x, raw.y, raw.width, raw.height)
    }
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(StructureError::invalid(format!(
                "bounding box at ({x}, {y}) has non-positive size {width}x{height}"
            )));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn x_position(&self) -> i32 {
        self.x
    }

    pub fn y_position(&self) -> i32 {
        self.y
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }

    /// Absolute distance between the top edges of two boxes.
    pub fn y_distance(&self, other: &BoundingBox) -> i64 {
        (i64::from(self.y) - i64::from(other.y)).abs()
    }

    /// Euclidean distance between box centers.
    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }
}

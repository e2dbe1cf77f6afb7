//! Positioned text and ruling primitives in PDF user space (y grows upward).

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
///
/// Serialized as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Same box with each axis ordered low to high.
    pub fn normalized(&self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether `x` lies within the horizontal span, edges included.
    pub fn spans_x(&self, x: f64) -> bool {
        self.x0 <= x && x <= self.x1
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// A horizontal run of text on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Zero-based page number.
    pub page: usize,
    pub bbox: BBox,
    pub text: String,
}

impl TextRun {
    pub fn new(page: usize, bbox: BBox, text: impl Into<String>) -> Self {
        Self {
            page,
            bbox,
            text: text.into(),
        }
    }

    /// Whether the run carries no visible characters.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Orientation of a ruling segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Fixed y, spans x.
    Horizontal,
    /// Fixed x, spans y.
    Vertical,
}

/// Where a ruling segment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentSource {
    Line,
    Rect,
}

/// A horizontal or vertical ruling segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub page: usize,
    pub axis: Axis,
    /// The fixed coordinate: y for horizontal, x for vertical segments.
    pub at: f64,
    /// Low end of the spanned coordinate.
    pub start: f64,
    /// High end of the spanned coordinate.
    pub end: f64,
    pub source: SegmentSource,
}

impl LineSegment {
    pub fn horizontal(page: usize, y: f64, x0: f64, x1: f64, source: SegmentSource) -> Self {
        Self {
            page,
            axis: Axis::Horizontal,
            at: y,
            start: x0.min(x1),
            end: x0.max(x1),
            source,
        }
    }

    pub fn vertical(page: usize, x: f64, y0: f64, y1: f64, source: SegmentSource) -> Self {
        Self {
            page,
            axis: Axis::Vertical,
            at: x,
            start: y0.min(y1),
            end: y0.max(y1),
            source,
        }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    /// Whether a vertical segment reaches the given y, ends included.
    pub fn covers(&self, y: f64) -> bool {
        self.start <= y && y <= self.end
    }
}

//! Geometric layout index.
//!
//! Turns per-page positioned primitives into ordered indices of text runs
//! and ruling segments that the locators and extractors query read-only.

mod dump;
mod geometry;
mod index;

pub use geometry::{Axis, BBox, LineSegment, SegmentSource, TextRun};
pub use index::{Coord, LayoutBuilder, LayoutContext, PageIndex, Row, SegmentRow};

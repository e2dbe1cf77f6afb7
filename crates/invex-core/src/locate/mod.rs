//! Locating text, table headers and line-item regions in a layout index.

mod header;
mod locator;
mod region;

pub use header::{ColumnBBox, HeaderMatch, HeaderMatcher};
pub use locator::{RegexHit, RightPosition, TextLocation, TextLocator};
pub use region::{RegionBounder, RegionBounds, RegionRow, RowPosition};

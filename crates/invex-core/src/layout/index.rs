//! Per-page geometric indices of text runs and ruling segments.
//!
//! Every page keeps four ordered maps: runs keyed by top edge, runs keyed by
//! bottom edge, horizontal segments keyed by y and vertical segments keyed by
//! x. The maps are built once and only read afterwards.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use ordered_float::OrderedFloat;
use tracing::{debug, trace};

use super::geometry::{BBox, LineSegment, SegmentSource, TextRun};
use crate::error::LayoutError;
use crate::models::config::LayoutConfig;
use crate::models::primitive::Primitive;

/// Map key for a coordinate.
pub type Coord = OrderedFloat<f64>;

/// Ruling segments sharing one fixed coordinate, keyed by span start.
pub type SegmentRow = BTreeMap<Coord, LineSegment>;

const EDGE_EPSILON: f64 = 1e-6;

/// Text runs sharing one edge coordinate, ordered left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    runs: Vec<TextRun>,
}

impl Row {
    fn insert(&mut self, run: TextRun) {
        let at = self.runs.partition_point(|r| r.bbox.x0 <= run.bbox.x0);
        self.runs.insert(at, run);
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    /// Runs joined by a single space.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Geometric index of a single page.
#[derive(Debug, Clone, Default)]
pub struct PageIndex {
    number: usize,
    by_top: BTreeMap<Coord, Row>,
    by_bottom: BTreeMap<Coord, Row>,
    horizontal: BTreeMap<Coord, SegmentRow>,
    vertical: BTreeMap<Coord, SegmentRow>,
}

impl PageIndex {
    /// Zero-based page number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Rows keyed by top edge (y1), ascending.
    pub fn rows_by_top(&self) -> &BTreeMap<Coord, Row> {
        &self.by_top
    }

    /// Rows keyed by bottom edge (y0), ascending.
    pub fn rows_by_bottom(&self) -> &BTreeMap<Coord, Row> {
        &self.by_bottom
    }

    pub fn horizontal_segments(&self) -> &BTreeMap<Coord, SegmentRow> {
        &self.horizontal
    }

    pub fn vertical_segments(&self) -> &BTreeMap<Coord, SegmentRow> {
        &self.vertical
    }

    /// Rows from the top of the page down, with their top-edge key.
    pub fn rows_top_down(&self) -> impl Iterator<Item = (f64, &Row)> + '_ {
        self.by_top.iter().rev().map(|(y, row)| (y.0, row))
    }

    /// Rows whose top edge lies strictly below `y`, nearest first.
    pub fn rows_below(&self, y: f64) -> impl Iterator<Item = (f64, &Row)> + '_ {
        self.by_top
            .range(..OrderedFloat(y))
            .rev()
            .map(|(y, row)| (y.0, row))
    }

    /// Rows of either edge map whose key lies within `span`.
    pub fn rows_within(&self, span: RangeInclusive<f64>) -> impl Iterator<Item = &Row> + '_ {
        let keys = OrderedFloat(*span.start())..=OrderedFloat(*span.end());
        self.by_top
            .range(keys.clone())
            .rev()
            .chain(self.by_bottom.range(keys).rev())
            .map(|(_, row)| row)
    }

    /// All runs, top-down then left to right.
    pub fn runs(&self) -> impl Iterator<Item = &TextRun> + '_ {
        self.rows_top_down().flat_map(|(_, row)| row.runs.iter())
    }

    /// Whether any horizontal rule lies within `low..=high`.
    pub fn has_horizontal_between(&self, low: f64, high: f64) -> bool {
        if low > high {
            return false;
        }
        self.horizontal
            .range(OrderedFloat(low)..=OrderedFloat(high))
            .next()
            .is_some()
    }

    /// Nearest vertical rule at or left of `x` that reaches `y`.
    pub fn vertical_left_of(&self, x: f64, y: f64) -> Option<&LineSegment> {
        self.vertical
            .range(..=OrderedFloat(x))
            .rev()
            .find_map(|(_, segs)| Self::covering(segs, y))
    }

    /// Nearest vertical rule at or right of `x` that reaches `y`.
    pub fn vertical_right_of(&self, x: f64, y: f64) -> Option<&LineSegment> {
        self.vertical
            .range(OrderedFloat(x)..)
            .find_map(|(_, segs)| Self::covering(segs, y))
    }

    fn covering(segs: &SegmentRow, y: f64) -> Option<&LineSegment> {
        segs.values().find(|seg| seg.covers(y))
    }
}

/// The immutable layout index of a whole document.
#[derive(Debug, Clone, Default)]
pub struct LayoutContext {
    pages: Vec<PageIndex>,
}

impl LayoutContext {
    /// Build the index from per-page primitive lists.
    pub fn from_pages(pages: &[Vec<Primitive>], config: &LayoutConfig) -> Result<Self, LayoutError> {
        let mut builder = LayoutBuilder::new().with_character_closeness(config.character_closeness);
        for page in pages {
            builder.add_page(page)?;
        }
        builder.finish()
    }

    pub fn pages(&self) -> &[PageIndex] {
        &self.pages
    }

    pub fn page(&self, number: usize) -> Option<&PageIndex> {
        self.pages.get(number)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Incremental builder for [`LayoutContext`].
///
/// Pages are opened with [`begin_page`](Self::begin_page) and primitives are
/// pushed in content order; consecutive characters are merged into runs.
#[derive(Debug)]
pub struct LayoutBuilder {
    character_closeness: f64,
    by_top: Vec<BTreeMap<Coord, Row>>,
    by_bottom: Vec<BTreeMap<Coord, Row>>,
    horizontal: Vec<BTreeMap<Coord, SegmentRow>>,
    vertical: Vec<BTreeMap<Coord, SegmentRow>>,
    pending: Option<TextRun>,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self {
            character_closeness: LayoutConfig::default().character_closeness,
            by_top: Vec::new(),
            by_bottom: Vec::new(),
            horizontal: Vec::new(),
            vertical: Vec::new(),
            pending: None,
        }
    }

    /// Maximum gap between characters merged into one run.
    pub fn with_character_closeness(mut self, closeness: f64) -> Self {
        self.character_closeness = closeness;
        self
    }

    /// Open a new, initially empty page.
    pub fn begin_page(&mut self) {
        self.flush_pending();
        self.by_top.push(BTreeMap::new());
        self.by_bottom.push(BTreeMap::new());
        self.horizontal.push(BTreeMap::new());
        self.vertical.push(BTreeMap::new());
    }

    /// Close the current page.
    pub fn end_page(&mut self) {
        self.flush_pending();
    }

    /// Add one complete page.
    pub fn add_page(&mut self, primitives: &[Primitive]) -> Result<(), LayoutError> {
        self.begin_page();
        for primitive in primitives {
            self.push(primitive)?;
        }
        self.end_page();
        Ok(())
    }

    /// Add a primitive to the current page.
    pub fn push(&mut self, primitive: &Primitive) -> Result<(), LayoutError> {
        let page = self.by_top.len().checked_sub(1).ok_or(LayoutError::NoOpenPage)?;

        match primitive {
            Primitive::Char { bbox, text } => self.push_char(page, bbox.normalized(), text),
            Primitive::Word { bbox, text } => {
                self.flush_pending();
                self.insert_run(TextRun::new(page, bbox.normalized(), text.clone()));
            }
            Primitive::Line { bbox } => self.push_line(page, bbox.normalized()),
            Primitive::Rect { bbox } => self.push_rect(page, bbox.normalized()),
            Primitive::Group { children } => {
                for child in children {
                    self.push(child)?;
                }
            }
        }
        Ok(())
    }

    /// Finish the index, verifying that every map covers the same pages.
    pub fn finish(mut self) -> Result<LayoutContext, LayoutError> {
        self.flush_pending();

        let counts = (
            self.by_top.len(),
            self.by_bottom.len(),
            self.horizontal.len(),
            self.vertical.len(),
        );
        if counts.0 != counts.1 || counts.0 != counts.2 || counts.0 != counts.3 {
            return Err(LayoutError::PageCountMismatch {
                top: counts.0,
                bottom: counts.1,
                horizontal: counts.2,
                vertical: counts.3,
            });
        }

        let pages: Vec<PageIndex> = self
            .by_top
            .into_iter()
            .zip(self.by_bottom)
            .zip(self.horizontal)
            .zip(self.vertical)
            .enumerate()
            .map(|(number, (((by_top, by_bottom), horizontal), vertical))| PageIndex {
                number,
                by_top,
                by_bottom,
                horizontal,
                vertical,
            })
            .collect();

        for page in &pages {
            debug!(
                "Page {}: {} rows, {} horizontal / {} vertical rule positions",
                page.number,
                page.by_top.len(),
                page.horizontal.len(),
                page.vertical.len()
            );
        }

        Ok(LayoutContext { pages })
    }

    fn push_char(&mut self, page: usize, bbox: BBox, text: &str) {
        if let Some(run) = self.pending.as_mut() {
            let same_line = (run.bbox.y0 - bbox.y0).abs() <= EDGE_EPSILON
                && (run.bbox.y1 - bbox.y1).abs() <= EDGE_EPSILON;
            let gap = bbox.x0 - run.bbox.x1;
            if run.page == page && same_line && gap.abs() <= self.character_closeness {
                run.text.push_str(text);
                run.bbox.x1 = run.bbox.x1.max(bbox.x1);
                return;
            }
        }
        self.flush_pending();
        self.pending = Some(TextRun::new(page, bbox, text));
    }

    fn flush_pending(&mut self) {
        if let Some(run) = self.pending.take() {
            self.insert_run(run);
        }
    }

    fn insert_run(&mut self, run: TextRun) {
        if run.text.is_empty() {
            return;
        }
        let (Some(by_top), Some(by_bottom)) =
            (self.by_top.get_mut(run.page), self.by_bottom.get_mut(run.page))
        else {
            return;
        };
        by_bottom
            .entry(OrderedFloat(run.bbox.y0))
            .or_default()
            .insert(run.clone());
        by_top.entry(OrderedFloat(run.bbox.y1)).or_default().insert(run);
    }

    fn push_line(&mut self, page: usize, bbox: BBox) {
        if bbox.height().abs() <= EDGE_EPSILON {
            self.insert_horizontal(LineSegment::horizontal(page, bbox.y0, bbox.x0, bbox.x1, SegmentSource::Line));
        } else if bbox.width().abs() <= EDGE_EPSILON {
            self.insert_vertical(LineSegment::vertical(page, bbox.x0, bbox.y0, bbox.y1, SegmentSource::Line));
        } else {
            trace!("Ignoring diagonal line {:?} on page {}", bbox, page);
        }
    }

    fn push_rect(&mut self, page: usize, bbox: BBox) {
        for y in [bbox.y0, bbox.y1] {
            self.insert_horizontal(LineSegment::horizontal(page, y, bbox.x0, bbox.x1, SegmentSource::Rect));
        }
        for x in [bbox.x0, bbox.x1] {
            self.insert_vertical(LineSegment::vertical(page, x, bbox.y0, bbox.y1, SegmentSource::Rect));
        }
    }

    fn insert_horizontal(&mut self, seg: LineSegment) {
        let Some(map) = self.horizontal.get_mut(seg.page) else {
            return;
        };
        let row = map.entry(OrderedFloat(seg.at)).or_default();
        match row.get_mut(&OrderedFloat(seg.start)) {
            Some(existing) if existing.end >= seg.end => {}
            Some(existing) => *existing = seg,
            None => {
                row.insert(OrderedFloat(seg.start), seg);
            }
        }
    }

    fn insert_vertical(&mut self, seg: LineSegment) {
        let Some(map) = self.vertical.get_mut(seg.page) else {
            return;
        };
        let row = map.entry(OrderedFloat(seg.at)).or_default();
        match row.get_mut(&OrderedFloat(seg.start)) {
            Some(existing) => existing.end = existing.end.max(seg.end),
            None => {
                row.insert(OrderedFloat(seg.start), seg);
            }
        }
    }
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

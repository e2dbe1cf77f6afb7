//! Line-item region bounds.

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::ExtractionError;
use crate::layout::{LayoutContext, Row};

/// A row on a page, identified by its top-edge key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RowPosition {
    pub page: usize,
    pub y: f64,
}

impl RowPosition {
    pub fn new(page: usize, y: f64) -> Self {
        Self { page, y }
    }

    /// Below the last row of the last page.
    pub fn document_end(ctx: &LayoutContext) -> Self {
        Self {
            page: ctx.page_count().saturating_sub(1),
            y: f64::NEG_INFINITY,
        }
    }

    /// Whether this position comes strictly later in reading order.
    pub fn is_after(&self, other: &RowPosition) -> bool {
        self.page > other.page || (self.page == other.page && self.y < other.y)
    }
}

/// Start (excluded) and end (excluded) rows of a line-item region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionBounds {
    pub start: RowPosition,
    pub end: RowPosition,
}

/// A row inside a region.
#[derive(Debug, Clone, Copy)]
pub struct RegionRow<'c> {
    pub page: usize,
    pub y: f64,
    pub row: &'c Row,
    /// Key of the next row down on the same page, inside the region or not.
    pub next_y: Option<f64>,
}

impl RegionBounds {
    /// Bounds whose end lies strictly after the start.
    pub fn new(start: RowPosition, end: RowPosition) -> Result<Self, ExtractionError> {
        if !end.is_after(&start) {
            return Err(ExtractionError::InvalidRegion {
                start_page: start.page,
                start_y: start.y,
                end_page: end.page,
                end_y: end.y,
            });
        }
        Ok(Self { start, end })
    }

    /// Rows strictly between start and end, top-down.
    ///
    /// A row whose key comes within `end_margin` of the end row terminates
    /// the region.
    pub fn rows<'c>(&self, ctx: &'c LayoutContext, end_margin: f64) -> Vec<RegionRow<'c>> {
        let mut rows = Vec::new();
        let last_page = self.end.page.min(ctx.page_count().saturating_sub(1));

        for page in ctx.pages().iter().skip(self.start.page).take_while(|p| p.number() <= last_page) {
            let mut page_rows = page.rows_top_down().peekable();
            while let Some((y, row)) = page_rows.next() {
                if page.number() == self.start.page && y >= self.start.y {
                    continue;
                }
                if page.number() == self.end.page && y <= self.end.y + end_margin {
                    return rows;
                }
                rows.push(RegionRow {
                    page: page.number(),
                    y,
                    row,
                    next_y: page_rows.peek().map(|(next, _)| *next),
                });
            }
        }
        rows
    }
}

fn row_matches(row: &Row, pattern: &Regex) -> bool {
    row.runs().iter().any(|run| pattern.is_match(&run.text)) || pattern.is_match(&row.text())
}

/// Finds region boundaries by delimiter pattern.
#[derive(Debug, Clone, Copy)]
pub struct RegionBounder<'a> {
    ctx: &'a LayoutContext,
}

impl<'a> RegionBounder<'a> {
    pub fn new(ctx: &'a LayoutContext) -> Self {
        Self { ctx }
    }

    /// First row in document order matching `pattern`.
    pub fn find_start(&self, pattern: &Regex) -> Result<RowPosition, ExtractionError> {
        self.ctx
            .pages()
            .iter()
            .find_map(|page| {
                page.rows_top_down()
                    .find(|(_, row)| row_matches(row, pattern))
                    .map(|(y, _)| RowPosition::new(page.number(), y))
            })
            .ok_or_else(|| ExtractionError::RegionStartNotFound(pattern.as_str().to_string()))
    }

    /// First row strictly after `start` matching `pattern`.
    pub fn find_end(&self, start: RowPosition, pattern: &Regex) -> Result<RowPosition, ExtractionError> {
        self.ctx
            .pages()
            .iter()
            .skip(start.page)
            .find_map(|page| {
                page.rows_top_down()
                    .filter(|(y, _)| page.number() != start.page || *y < start.y)
                    .find(|(_, row)| row_matches(row, pattern))
                    .map(|(y, _)| RowPosition::new(page.number(), y))
            })
            .ok_or_else(|| ExtractionError::RegionEndNotFound(pattern.as_str().to_string()))
    }

    /// Region from `start` to the row matching `line_end`, or to the end of
    /// the document when there is no end pattern.
    pub fn bounds(&self, start: RowPosition, line_end: Option<&Regex>) -> Result<RegionBounds, ExtractionError> {
        let end = match line_end {
            Some(pattern) => self.find_end(start, pattern)?,
            None => RowPosition::document_end(self.ctx),
        };
        debug!("Line-item region: {:?} -> {:?}", start, end);
        RegionBounds::new(start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BBox;
    use crate::models::config::LayoutConfig;
    use crate::models::primitive::Primitive;
    use pretty_assertions::assert_eq;

    fn word(x0: f64, y1: f64, text: &str) -> Primitive {
        Primitive::word(BBox::new(x0, y1 - 10.0, x0 + 50.0, y1), text)
    }

    fn two_pages() -> LayoutContext {
        let pages = vec![
            vec![
                word(50.0, 700.0, "Items"),
                word(50.0, 680.0, "Total"),
                word(50.0, 660.0, "Widget"),
                word(150.0, 660.0, "10.00"),
            ],
            vec![word(50.0, 700.0, "Gadget"), word(50.0, 680.0, "Sub"), word(120.0, 680.0, "Total")],
        ];
        LayoutContext::from_pages(&pages, &LayoutConfig::default()).unwrap()
    }

    #[test]
    fn test_end_must_follow_start() {
        let start = RowPosition::new(0, 500.0);

        let same_row = RegionBounds::new(start, RowPosition::new(0, 500.0)).unwrap_err();
        assert!(same_row.is_configuration());

        let above = RegionBounds::new(start, RowPosition::new(0, 600.0)).unwrap_err();
        assert_eq!(
            above,
            ExtractionError::InvalidRegion {
                start_page: 0,
                start_y: 500.0,
                end_page: 0,
                end_y: 600.0,
            }
        );

        assert!(RegionBounds::new(start, RowPosition::new(1, 800.0)).is_ok());
        assert!(RegionBounds::new(start, RowPosition::new(0, 400.0)).is_ok());
    }

    #[test]
    fn test_find_end_skips_rows_at_or_above_start() {
        let ctx = two_pages();
        let bounder = RegionBounder::new(&ctx);
        let total = Regex::new("Total").unwrap();

        let start = bounder.find_start(&Regex::new("^Items$").unwrap()).unwrap();
        assert_eq!(start, RowPosition::new(0, 700.0));
        assert_eq!(bounder.find_end(start, &total).unwrap(), RowPosition::new(0, 680.0));

        let after_first_total = RowPosition::new(0, 680.0);
        assert_eq!(
            bounder.find_end(after_first_total, &total).unwrap(),
            RowPosition::new(1, 680.0)
        );
    }

    #[test]
    fn test_row_text_is_matched_as_a_whole() {
        let ctx = two_pages();
        let bounder = RegionBounder::new(&ctx);

        let end = bounder
            .find_end(RowPosition::new(0, 700.0), &Regex::new("^Sub Total$").unwrap())
            .unwrap();
        assert_eq!(end, RowPosition::new(1, 680.0));
    }

    #[test]
    fn test_missing_delimiters_are_not_found() {
        let ctx = two_pages();
        let bounder = RegionBounder::new(&ctx);
        let pattern = Regex::new("Grand total").unwrap();

        assert!(bounder.find_start(&pattern).unwrap_err().is_not_found());
        assert_eq!(
            bounder.find_end(RowPosition::new(0, 700.0), &pattern).unwrap_err(),
            ExtractionError::RegionEndNotFound("Grand total".to_string())
        );
    }

    #[test]
    fn test_region_rows_span_pages_and_stop_at_end() {
        let ctx = two_pages();
        let bounder = RegionBounder::new(&ctx);
        let start = RowPosition::new(0, 680.0);
        let bounds = bounder.bounds(start, Some(&Regex::new("Sub").unwrap())).unwrap();

        let rows = bounds.rows(&ctx, 5.0);
        let texts: Vec<String> = rows.iter().map(|r| r.row.text()).collect();
        assert_eq!(texts, vec!["Widget 10.00", "Gadget"]);
        assert_eq!(rows[1].next_y, Some(680.0));
        assert_eq!(rows[0].next_y, None);
    }

    #[test]
    fn test_region_without_end_pattern_runs_to_document_end() {
        let ctx = two_pages();
        let bounds = RegionBounder::new(&ctx)
            .bounds(RowPosition::new(0, 700.0), None)
            .unwrap();

        assert_eq!(bounds.end.page, 1);
        assert_eq!(bounds.rows(&ctx, 5.0).len(), 4);
    }
}

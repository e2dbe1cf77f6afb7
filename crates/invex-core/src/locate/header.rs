//! Table header matching.
//!
//! A column header may be printed over several physical lines, and one text
//! run may cover several columns. Each column's name is split into fragments
//! (one per printed line) and the page is scanned row by row, advancing a
//! per-column fragment pointer until every column is complete.

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::ExtractionError;
use crate::layout::{BBox, LayoutContext, TextRun};
use crate::models::template::ColumnSpec;

/// Resolved header box of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnBBox {
    /// Full column name, as used for output keys.
    pub name: String,
    pub bbox: BBox,
}

/// A completed header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderMatch {
    pub page: usize,
    /// Top edge of the row that completed the header.
    pub y: f64,
    /// One box per column, in template order.
    pub columns: Vec<ColumnBBox>,
}

/// One column fragment consumed from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    column: usize,
    chars: usize,
}

/// Per-column matching state.
#[derive(Debug, Clone)]
struct Progress<'c> {
    columns: &'c [ColumnSpec],
    pointers: Vec<usize>,
    boxes: Vec<Option<BBox>>,
}

impl<'c> Progress<'c> {
    fn new(columns: &'c [ColumnSpec]) -> Self {
        Self {
            columns,
            pointers: vec![0; columns.len()],
            boxes: vec![None; columns.len()],
        }
    }

    fn reset(&mut self) {
        self.pointers.iter_mut().for_each(|p| *p = 0);
        self.boxes.iter_mut().for_each(|b| *b = None);
    }

    fn has_remaining(&self, column: usize) -> bool {
        self.pointers[column] < self.columns[column].fragments.len()
    }

    fn is_complete(&self) -> bool {
        (0..self.columns.len()).all(|c| !self.has_remaining(c))
    }

    /// Apply the steps matched in `run`, estimating each fragment's extent
    /// from the run's average character width.
    fn advance(&mut self, run: &TextRun, steps: &[Step]) {
        let char_count = run.text.chars().count().max(1);
        let char_width = run.bbox.width() / char_count as f64;
        let mut x = run.bbox.x0;

        for step in steps {
            let end = x + step.chars as f64 * char_width;
            let piece = BBox::new(x, run.bbox.y0, end, run.bbox.y1);
            let slot = &mut self.boxes[step.column];
            *slot = Some(slot.map_or(piece, |b| b.union(&piece)));
            self.pointers[step.column] += 1;
            x = end + char_width;
        }
    }

    fn into_match(self, page: usize, y: f64) -> HeaderMatch {
        let columns = self
            .columns
            .iter()
            .zip(self.boxes)
            .map(|(column, bbox)| ColumnBBox {
                name: column.name.clone(),
                bbox: bbox.unwrap_or_default(),
            })
            .collect();
        HeaderMatch { page, y, columns }
    }
}

/// Match `text` against the next unmatched fragments, starting at `column`.
///
/// A fragment that is a strict prefix of `text` must be followed by the same
/// column's next fragment or a later column's current one; if that fails the
/// whole match fails.
fn match_fragments(text: &str, columns: &[ColumnSpec], pointers: &[usize], column: usize) -> Option<Vec<Step>> {
    for c in column..columns.len() {
        let Some(fragment) = columns[c].fragments.get(pointers[c]) else {
            continue;
        };
        let step = Step {
            column: c,
            chars: fragment.chars().count(),
        };

        if text == fragment {
            return Some(vec![step]);
        }
        if let Some(rest) = text.strip_prefix(fragment.as_str()) {
            let residual = rest.trim();
            if residual.is_empty() {
                return Some(vec![step]);
            }
            let mut advanced = pointers.to_vec();
            advanced[c] += 1;
            let mut steps = match_fragments(residual, columns, &advanced, c)?;
            steps.insert(0, step);
            return Some(steps);
        }
    }
    None
}

/// Finds table headers in a [`LayoutContext`].
#[derive(Debug, Clone, Copy)]
pub struct HeaderMatcher<'a> {
    ctx: &'a LayoutContext,
}

impl<'a> HeaderMatcher<'a> {
    pub fn new(ctx: &'a LayoutContext) -> Self {
        Self { ctx }
    }

    /// Locate the first complete header for `columns`.
    pub fn find(&self, columns: &[ColumnSpec]) -> Result<HeaderMatch, ExtractionError> {
        if columns.is_empty() {
            return Err(ExtractionError::NoColumns);
        }

        for page in self.ctx.pages() {
            let mut progress = Progress::new(columns);

            for (y, row) in page.rows_top_down() {
                let mut resume = 0;
                let mut matched = false;

                for run in row.runs().iter().filter(|r| !r.is_blank()) {
                    let Some(steps) = match_fragments(run.text.trim(), columns, &progress.pointers, resume) else {
                        continue;
                    };
                    trace!("Header run {:?} matched {:?}", run.text, steps);
                    progress.advance(run, &steps);
                    matched = true;

                    if let Some(last) = steps.last() {
                        resume = if progress.has_remaining(last.column) {
                            last.column
                        } else {
                            last.column + 1
                        };
                    }
                }

                if !matched {
                    progress.reset();
                    continue;
                }
                if progress.is_complete() {
                    debug!("Header found on page {} at y={:.2}", page.number(), y);
                    return Ok(progress.into_match(page.number(), y));
                }
            }
        }

        Err(ExtractionError::HeaderNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::LayoutConfig;
    use crate::models::primitive::Primitive;
    use crate::models::template::Alignment;
    use pretty_assertions::assert_eq;

    fn column(name: &str) -> ColumnSpec {
        ColumnSpec {
            name: name.to_string(),
            fragments: name.split('\n').map(str::to_string).collect(),
            alignment: Alignment::Left,
            row_start: false,
        }
    }

    fn word(x0: f64, y0: f64, x1: f64, y1: f64, text: &str) -> Primitive {
        Primitive::word(BBox::new(x0, y0, x1, y1), text)
    }

    fn context(page: Vec<Primitive>) -> LayoutContext {
        LayoutContext::from_pages(&[page], &LayoutConfig::default()).unwrap()
    }

    #[test]
    fn test_header_split_over_two_rows() {
        let ctx = context(vec![
            word(50.0, 600.0, 80.0, 610.0, "Qty"),
            word(100.0, 600.0, 130.0, 610.0, "Unit"),
            word(140.0, 600.0, 175.0, 610.0, "Price"),
            word(200.0, 588.0, 240.0, 598.0, "Total"),
        ]);
        let columns = vec![column("Qty"), column("Unit\nPrice"), column("Total")];

        let header = HeaderMatcher::new(&ctx).find(&columns).unwrap();

        // completed by the second row only
        assert_eq!(header.y, 598.0);
        assert_eq!(header.columns[1].name, "Unit\nPrice");
        assert_eq!(header.columns[1].bbox, BBox::new(100.0, 600.0, 175.0, 610.0));
        assert_eq!(header.columns[2].bbox, BBox::new(200.0, 588.0, 240.0, 598.0));
    }

    #[test]
    fn test_classic_wrapped_header() {
        let ctx = context(vec![
            word(50.0, 600.0, 80.0, 610.0, "Qty"),
            word(100.0, 600.0, 130.0, 610.0, "Unit"),
            word(200.0, 600.0, 240.0, 610.0, "Total"),
            word(100.0, 588.0, 135.0, 598.0, "Price"),
        ]);
        let columns = vec![column("Qty"), column("Unit\nPrice"), column("Total")];

        let header = HeaderMatcher::new(&ctx).find(&columns).unwrap();
        assert_eq!(header.y, 598.0);
        assert_eq!(header.columns[1].bbox, BBox::new(100.0, 588.0, 135.0, 610.0));
    }

    #[test]
    fn test_one_run_spanning_several_columns() {
        // "Qty Description" is a single run of 15 characters, 2pt each
        let ctx = context(vec![
            word(50.0, 600.0, 80.0, 610.0, "Qty Description"),
            word(200.0, 600.0, 240.0, 610.0, "Amount"),
        ]);
        let columns = vec![column("Qty"), column("Description"), column("Amount")];

        let header = HeaderMatcher::new(&ctx).find(&columns).unwrap();
        assert_eq!(header.columns[0].bbox, BBox::new(50.0, 600.0, 56.0, 610.0));
        assert_eq!(header.columns[1].bbox, BBox::new(58.0, 600.0, 80.0, 610.0));
    }

    #[test]
    fn test_row_without_match_resets_progress() {
        let ctx = context(vec![
            word(50.0, 700.0, 80.0, 710.0, "Qty"),
            word(50.0, 650.0, 150.0, 660.0, "Terms and conditions"),
            word(200.0, 600.0, 240.0, 610.0, "Amount"),
        ]);
        let columns = vec![column("Qty"), column("Amount")];

        let err = HeaderMatcher::new(&ctx).find(&columns).unwrap_err();
        assert_eq!(err, ExtractionError::HeaderNotFound);
    }

    #[test]
    fn test_prefix_with_unmatched_residual_fails_run() {
        let columns = vec![column("Unit"), column("Total")];
        assert_eq!(match_fragments("Units", &columns, &[0, 0], 0), None);
        assert_eq!(
            match_fragments("Unit Total", &columns, &[0, 0], 0),
            Some(vec![Step { column: 0, chars: 4 }, Step { column: 1, chars: 5 }])
        );
    }

    #[test]
    fn test_no_columns_is_configuration_error() {
        let ctx = context(Vec::new());
        assert_eq!(
            HeaderMatcher::new(&ctx).find(&[]).unwrap_err(),
            ExtractionError::NoColumns
        );
    }
}

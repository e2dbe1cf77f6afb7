//! Table line-item extraction.
//!
//! Rows between a matched header and the table footer are split into cells
//! by ruling lines or by alignment with the header boxes, then grouped into
//! line items either by horizontal rules or by a row-start state machine.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::{debug, warn};

use super::LineItemOutput;
use crate::error::Result;
use crate::layout::{BBox, LayoutContext, PageIndex, TextRun};
use crate::locate::{ColumnBBox, HeaderMatcher, RegionBounder, RegionRow, RowPosition};
use crate::models::config::TableConfig;
use crate::models::output::LineItem;
use crate::models::template::{Alignment, ColumnSpec, TableTemplate};

/// Cell texts of one row, keyed by column index.
type RowCells = BTreeMap<usize, String>;

/// How a run was matched to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assignment {
    Ruled(usize),
    Aligned(usize),
    Forced(usize),
    Unassigned,
}

/// How a row relates to the rows before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    /// Has text in every row-start column.
    RowStart,
    /// Within the closeness threshold of the previous row.
    Close,
    /// Neither.
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
enum BufferState {
    AwaitingRowStart,
    Buffering,
    FlushPending(Vec<RowCells>),
}

/// Groups unruled rows into line items.
///
/// `held` is the open record (plus rows that did not start one), `segment`
/// collects rows after a detached row that may still turn out to begin the
/// next record once their row-start columns are all filled.
#[derive(Debug)]
struct RowBuffer<'c> {
    columns: &'c [ColumnSpec],
    row_start: Vec<usize>,
    state: BufferState,
    held: Vec<RowCells>,
    segment: Vec<RowCells>,
    segment_columns: BTreeSet<usize>,
}

impl<'c> RowBuffer<'c> {
    fn new(columns: &'c [ColumnSpec]) -> Self {
        Self {
            columns,
            row_start: columns
                .iter()
                .enumerate()
                .filter(|(_, c)| c.row_start)
                .map(|(i, _)| i)
                .collect(),
            state: BufferState::AwaitingRowStart,
            held: Vec::new(),
            segment: Vec::new(),
            segment_columns: BTreeSet::new(),
        }
    }

    fn is_row_start(&self, cells: &RowCells) -> bool {
        self.row_start.iter().all(|c| cells.contains_key(c))
    }

    /// Feed one row; returns a line item when a record boundary was reached.
    fn push(&mut self, cells: RowCells, kind: RowKind) -> Option<LineItem> {
        match kind {
            RowKind::RowStart => {
                let ready = self.take_all();
                self.held.push(cells);
                self.enter(ready);
            }
            RowKind::Close if self.segment.is_empty() && self.state == BufferState::Buffering => {
                self.held.push(cells);
            }
            RowKind::Close => {
                self.segment_columns.extend(cells.keys().copied());
                self.segment.push(cells);
                if self.row_start.iter().all(|c| self.segment_columns.contains(c)) {
                    let ready = std::mem::take(&mut self.held);
                    self.held = std::mem::take(&mut self.segment);
                    self.segment_columns.clear();
                    self.enter(ready);
                }
            }
            RowKind::Detached => {
                self.held.append(&mut self.segment);
                self.segment_columns = cells.keys().copied().collect();
                self.segment.push(cells);
            }
        }
        self.take_ready()
    }

    /// Flush whatever remains at the end of the region.
    fn finish(&mut self) -> Option<LineItem> {
        let rest = self.take_all();
        self.state = BufferState::FlushPending(rest);
        let item = self.take_ready();
        self.state = BufferState::AwaitingRowStart;
        item
    }

    fn take_all(&mut self) -> Vec<RowCells> {
        let mut rows = std::mem::take(&mut self.held);
        rows.append(&mut self.segment);
        self.segment_columns.clear();
        rows
    }

    fn enter(&mut self, ready: Vec<RowCells>) {
        self.state = if ready.is_empty() {
            BufferState::Buffering
        } else {
            BufferState::FlushPending(ready)
        };
    }

    fn take_ready(&mut self) -> Option<LineItem> {
        match std::mem::replace(&mut self.state, BufferState::Buffering) {
            BufferState::FlushPending(rows) => merge_rows(self.columns, &rows),
            other => {
                self.state = other;
                None
            }
        }
    }
}

/// Merge rows into one item; `None` when nothing was collected.
fn merge_rows(columns: &[ColumnSpec], rows: &[RowCells]) -> Option<LineItem> {
    let mut item = LineItem::new();
    for row in rows {
        for (&column, text) in row {
            item.append(&columns[column].name, text);
        }
    }
    (!item.is_empty()).then_some(item)
}

fn is_aligned(alignment: Alignment, header: &BBox, run: &BBox, margin: f64) -> bool {
    match alignment {
        Alignment::Left => (run.x0 - header.x0).abs() <= margin,
        Alignment::Right => (run.x1 - header.x1).abs() <= margin,
        Alignment::Center => {
            header.spans_x(run.x0)
                || header.spans_x(run.x1)
                || (run.x0 < header.x0 && run.x1 > header.x1)
        }
    }
}

/// Extracts line items from a table located by its header.
#[derive(Debug, Clone)]
pub struct TableExtractor<'a> {
    ctx: &'a LayoutContext,
    config: TableConfig,
}

impl<'a> TableExtractor<'a> {
    pub fn new(ctx: &'a LayoutContext) -> Self {
        Self {
            ctx,
            config: TableConfig::default(),
        }
    }

    /// Use custom tolerances.
    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Locate the table described by `table` and rebuild its line items.
    pub fn extract(&self, table: &TableTemplate) -> Result<LineItemOutput> {
        let columns = table.resolve_columns()?;
        let header = HeaderMatcher::new(self.ctx).find(&columns)?;
        let line_end = table.line_end.as_deref().map(Regex::new).transpose()?;

        let start = RowPosition::new(header.page, header.y);
        let bounds = RegionBounder::new(self.ctx).bounds(start, line_end.as_ref())?;
        let rows = bounds.rows(self.ctx, self.config.end_location_margin);
        debug!("Table region has {} rows", rows.len());

        let mut output = LineItemOutput::default();
        let mut cells_per_row = Vec::with_capacity(rows.len());
        for row in &rows {
            let cells = self.split_row(row, &columns, &header.columns, table.vertical_lines, &mut output.warnings);
            cells_per_row.push(cells);
        }

        output.items = if table.horizontal_lines {
            self.group_by_rules(&columns, &rows, cells_per_row)
        } else {
            self.group_by_row_start(&columns, &rows, cells_per_row)
        };
        debug!("Extracted {} table line items", output.items.len());
        Ok(output)
    }

    /// Assign every non-blank run of a row to a column.
    fn split_row(
        &self,
        row: &RegionRow<'_>,
        columns: &[ColumnSpec],
        boxes: &[ColumnBBox],
        ruled: bool,
        warnings: &mut Vec<String>,
    ) -> RowCells {
        let page = self.ctx.page(row.page);
        let mut cells = RowCells::new();
        let mut next_column = 0;

        for run in row.row.runs().iter().filter(|r| !r.is_blank()) {
            let assignment = self.assign(page, run, columns, boxes, ruled, next_column);
            let column = match assignment {
                Assignment::Ruled(c) | Assignment::Aligned(c) => c,
                Assignment::Forced(c) => {
                    warn!("Forced {:?} into column {:?}", run.text, columns[c].name);
                    c
                }
                Assignment::Unassigned => {
                    warn!("No column for {:?} on page {} at y={:.2}", run.text, row.page, row.y);
                    warnings.push(format!(
                        "skipped table text {:?} on page {}: no matching column",
                        run.text,
                        row.page + 1
                    ));
                    continue;
                }
            };
            if let Assignment::Aligned(c) = assignment {
                next_column = c + 1;
            }

            match cells.get_mut(&column) {
                Some(text) => {
                    text.push('\n');
                    text.push_str(&run.text);
                }
                None => {
                    cells.insert(column, run.text.clone());
                }
            }
        }
        cells
    }

    fn assign(
        &self,
        page: Option<&PageIndex>,
        run: &TextRun,
        columns: &[ColumnSpec],
        boxes: &[ColumnBBox],
        ruled: bool,
        next_column: usize,
    ) -> Assignment {
        let b = run.bbox;

        if ruled {
            if let Some(column) = page.and_then(|page| Self::between_rules(page, &b, boxes)) {
                return Assignment::Ruled(column);
            }
        }

        let margin = self.config.alignment_margin;
        if let Some(column) = (next_column..columns.len())
            .find(|&c| is_aligned(columns[c].alignment, &boxes[c].bbox, &b, margin))
        {
            return Assignment::Aligned(column);
        }

        boxes
            .iter()
            .position(|h| h.bbox.spans_x(b.x0) || b.x0 <= h.bbox.x0)
            .map_or(Assignment::Unassigned, Assignment::Forced)
    }

    /// Column whose header lies between the vertical rules around the run.
    fn between_rules(page: &PageIndex, run: &BBox, boxes: &[ColumnBBox]) -> Option<usize> {
        let left = page.vertical_left_of(run.x0, run.y0);
        let right = page.vertical_right_of(run.x1, run.y0);

        match (left, right) {
            (Some(left), Some(right)) => boxes
                .iter()
                .position(|h| h.bbox.x0 >= left.at && h.bbox.x1 <= right.at),
            (None, Some(right)) if boxes.len() >= 2 => {
                (boxes[0].bbox.x1 <= right.at && right.at <= boxes[1].bbox.x1).then_some(0)
            }
            _ => None,
        }
    }

    /// One line item per band between horizontal rules.
    fn group_by_rules(&self, columns: &[ColumnSpec], rows: &[RegionRow<'_>], cells: Vec<RowCells>) -> Vec<LineItem> {
        let mut items = Vec::new();
        let mut collected: Vec<RowCells> = Vec::new();

        for (row, cells) in rows.iter().zip(cells) {
            collected.push(cells);

            let ruled_below = row.next_y.is_some_and(|next_y| {
                row.y - next_y >= self.config.horizontal_line_margin
                    && self
                        .ctx
                        .page(row.page)
                        .is_some_and(|page| page.has_horizontal_between(next_y, row.y))
            });
            if ruled_below {
                items.extend(merge_rows(columns, &collected));
                collected.clear();
            }
        }
        items.extend(merge_rows(columns, &collected));
        items
    }

    /// Group unruled rows with the row-start state machine.
    fn group_by_row_start(&self, columns: &[ColumnSpec], rows: &[RegionRow<'_>], cells: Vec<RowCells>) -> Vec<LineItem> {
        let mut buffer = RowBuffer::new(columns);
        let mut items = Vec::new();
        let mut previous: Option<(usize, f64)> = None;

        for (row, cells) in rows.iter().zip(cells) {
            let kind = if buffer.is_row_start(&cells) {
                RowKind::RowStart
            } else if previous.is_some_and(|(page, y)| {
                page == row.page && (y - row.y).abs() < self.config.row_closeness
            }) {
                RowKind::Close
            } else {
                RowKind::Detached
            };
            previous = Some((row.page, row.y));

            if cells.is_empty() {
                continue;
            }
            items.extend(buffer.push(cells, kind));
        }
        items.extend(buffer.finish());
        items
    }
}

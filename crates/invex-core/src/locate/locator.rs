//! Keyword/regex search and directional navigation over the layout index.

use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use regex::Regex;
use serde::Serialize;
use tracing::trace;

use crate::layout::{BBox, LayoutContext, Row, TextRun};

/// Where a run was found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextLocation {
    pub page: usize,
    pub bbox: BBox,
}

impl From<&TextRun> for TextLocation {
    fn from(run: &TextRun) -> Self {
        Self {
            page: run.page,
            bbox: run.bbox,
        }
    }
}

/// A run matched by a pattern, with its first capture group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegexHit {
    pub location: TextLocation,
    /// Capture group 1, or empty when the pattern has none.
    pub capture: String,
}

/// Which run to the right of an anchor to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RightPosition {
    /// The first run right of the anchor.
    First,
    /// The run after that one in the same row.
    Second,
}

/// Read-only queries over a [`LayoutContext`].
#[derive(Debug, Clone, Copy)]
pub struct TextLocator<'a> {
    ctx: &'a LayoutContext,
}

impl<'a> TextLocator<'a> {
    pub fn new(ctx: &'a LayoutContext) -> Self {
        Self { ctx }
    }

    /// Runs whose text equals `keyword`, in page then reading order.
    pub fn search_keyword(&self, keyword: &str) -> Vec<TextLocation> {
        self.runs_in_reading_order()
            .filter(|run| run.text == keyword)
            .map(TextLocation::from)
            .collect()
    }

    /// Runs matched by `pattern`, in page then reading order.
    pub fn search_regex(&self, pattern: &Regex) -> Vec<RegexHit> {
        self.runs_in_reading_order()
            .filter_map(|run| {
                let caps = pattern.captures(&run.text)?;
                Some(RegexHit {
                    location: TextLocation::from(run),
                    capture: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Text of the nearest run below `loc` that lines up with it.
    ///
    /// A run lines up when it overlaps the anchor's left edge, starts exactly
    /// there, or starts within the anchor's horizontal span.
    pub fn text_at_bottom(&self, loc: &TextLocation) -> String {
        let Some(page) = self.ctx.page(loc.page) else {
            return String::new();
        };
        let anchor = loc.bbox;

        page.rows_below(anchor.y1)
            .flat_map(|(_, row)| row.runs())
            .find(|run| {
                let b = run.bbox;
                (b.x0 < anchor.x0 && b.x1 > anchor.x0)
                    || b.x0 == anchor.x0
                    || (b.x0 > anchor.x0 && b.x0 <= anchor.x1)
            })
            .map(|run| run.text.clone())
            .unwrap_or_default()
    }

    /// Text of the run to the right of `loc`.
    ///
    /// Candidates are runs starting at or after the anchor's right edge in
    /// rows within the anchor's vertical span, plus runs of other rows that
    /// straddle it. Ambiguity between several candidates is settled by
    /// vertical overlap and horizontal closeness.
    pub fn text_to_right(&self, position: RightPosition, loc: &TextLocation) -> String {
        let Some(page) = self.ctx.page(loc.page) else {
            return String::new();
        };
        let anchor = loc.bbox;

        let mut seen = BTreeSet::new();
        let mut candidates: Vec<&TextRun> = Vec::new();
        let mut push = |run: &'a TextRun, candidates: &mut Vec<&'a TextRun>| {
            let key = (
                OrderedFloat(run.bbox.x0),
                OrderedFloat(run.bbox.y0),
                OrderedFloat(run.bbox.x1),
                OrderedFloat(run.bbox.y1),
            );
            if seen.insert(key) {
                candidates.push(run);
            }
        };

        for row in page.rows_within(anchor.y0..=anchor.y1) {
            for run in Self::right_of(row, position, |run| run.bbox.x0 >= anchor.x1) {
                push(run, &mut candidates);
            }
        }
        for row in page.rows_by_top().values().rev() {
            let straddles = |run: &TextRun| {
                run.bbox.x0 >= anchor.x1 && run.bbox.y1 > anchor.y1 && run.bbox.y0 < anchor.y0
            };
            for run in Self::right_of(row, position, straddles) {
                push(run, &mut candidates);
            }
        }

        let chosen = match candidates.len() {
            0 => return String::new(),
            1 => candidates[0],
            _ => candidates[Self::disambiguate(&anchor, &candidates)],
        };
        trace!("Right of {:?}: {} candidates, chose {:?}", anchor, candidates.len(), chosen.text);
        chosen.text.clone()
    }

    /// Runs of `row` selected by `accept`, shifted by one for the second position.
    fn right_of<F>(row: &'a Row, position: RightPosition, accept: F) -> impl Iterator<Item = &'a TextRun>
    where
        F: Fn(&TextRun) -> bool,
    {
        let runs = row.runs();
        runs.iter()
            .enumerate()
            .filter(move |(_, run)| accept(run))
            .filter_map(move |(i, run)| match position {
                RightPosition::First => Some(run),
                RightPosition::Second => runs.get(i + 1),
            })
    }

    /// Index of the candidate to keep among several.
    fn disambiguate(anchor: &BBox, candidates: &[&TextRun]) -> usize {
        let overlaps: Vec<f64> = candidates.iter().map(|c| vertical_overlap(anchor, &c.bbox)).collect();
        let distances: Vec<f64> = candidates.iter().map(|c| c.bbox.x0 - anchor.x1).collect();

        let best_overlap = first_extreme(&overlaps, |a, b| a > b);
        let closest = first_extreme(&distances, |a, b| a < b);
        if best_overlap == closest {
            return best_overlap;
        }
        if overlaps[best_overlap] <= 0.0 {
            return closest;
        }
        if distances[best_overlap] <= 0.0 {
            return best_overlap;
        }

        let overlap_ratio = overlaps[closest] / overlaps[best_overlap];
        let closeness_ratio = distances[closest] / distances[best_overlap];
        if overlap_ratio < closeness_ratio {
            best_overlap
        } else {
            closest
        }
    }

    fn runs_in_reading_order(&self) -> impl Iterator<Item = &'a TextRun> + 'a {
        self.ctx.pages().iter().flat_map(|page| page.runs())
    }
}

/// How much of the anchor's vertical span a candidate shares.
fn vertical_overlap(anchor: &BBox, cand: &BBox) -> f64 {
    let starts_inside = anchor.y0 <= cand.y0 && cand.y0 < anchor.y1;
    if cand.y1 > anchor.y1 {
        if starts_inside {
            (anchor.y1 - cand.y0).abs()
        } else {
            anchor.height()
        }
    } else if cand.y1 == anchor.y1 {
        if cand.y0 >= anchor.y0 {
            (anchor.y1 - cand.y0).abs()
        } else {
            anchor.height()
        }
    } else if starts_inside {
        cand.height()
    } else {
        (cand.y1 - anchor.y0).abs()
    }
}

/// Index of the first value that beats every earlier one under `better`.
fn first_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}

//! Line items matched by an ordered list of patterns.
//!
//! The first pattern starts a new line item; the others continue it, each at
//! most once and strictly in order.

use regex::{Captures, Regex};
use tracing::{debug, trace};

use super::LineItemOutput;
use crate::error::Result;
use crate::layout::LayoutContext;
use crate::locate::RegionBounder;
use crate::models::output::LineItem;
use crate::models::template::RegexTemplate;

/// Extracts regex-described line items between two delimiter rows.
#[derive(Debug, Clone)]
pub struct RegexExtractor<'a> {
    ctx: &'a LayoutContext,
    end_margin: f64,
}

impl<'a> RegexExtractor<'a> {
    pub fn new(ctx: &'a LayoutContext) -> Self {
        Self { ctx, end_margin: 5.0 }
    }

    /// Rows within this distance of the end row terminate the region.
    pub fn with_end_margin(mut self, margin: f64) -> Self {
        self.end_margin = margin;
        self
    }

    pub fn extract(&self, template: &RegexTemplate) -> Result<LineItemOutput> {
        let patterns = template
            .lines
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let Some((primary, continuations)) = patterns.split_first() else {
            return Ok(LineItemOutput::default());
        };
        let line_start = Regex::new(&template.line_start)?;
        let line_end = template.line_end.as_deref().map(Regex::new).transpose()?;

        let bounder = RegionBounder::new(self.ctx);
        let start = bounder.find_start(&line_start)?;
        let bounds = bounder.bounds(start, line_end.as_ref())?;

        let mut output = LineItemOutput::default();
        let mut current: Option<LineItem> = None;
        let mut next = 0;

        for row in bounds.rows(self.ctx, self.end_margin) {
            let text = row.row.text();

            if let Some(caps) = primary.captures(&text) {
                output.items.extend(current.take().filter(|item| !item.is_empty()));
                let mut item = LineItem::new();
                append_captures(&mut item, &caps, &template.columns);
                current = Some(item);
                next = 0;
                continue;
            }

            let (Some(item), Some(pattern)) = (current.as_mut(), continuations.get(next)) else {
                trace!("Skipping row {:?}", text);
                continue;
            };
            if let Some(caps) = pattern.captures(&text) {
                append_captures(item, &caps, &template.columns);
                next += 1;
            }
        }
        output.items.extend(current.filter(|item| !item.is_empty()));

        debug!("Extracted {} regex line items", output.items.len());
        Ok(output)
    }
}

/// Copy the named groups listed in `columns` that took part in the match.
fn append_captures(item: &mut LineItem, caps: &Captures<'_>, columns: &[String]) {
    for column in columns {
        if let Some(m) = caps.name(column) {
            item.append(column, m.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BBox;
    use crate::models::config::LayoutConfig;
    use crate::models::primitive::Primitive;
    use pretty_assertions::assert_eq;

    fn lines(texts: &[&str]) -> LayoutContext {
        let page = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let y1 = 700.0 - 15.0 * i as f64;
                Primitive::word(BBox::new(50.0, y1 - 10.0, 300.0, y1), *text)
            })
            .collect();
        LayoutContext::from_pages(&[page], &LayoutConfig::default()).unwrap()
    }

    fn template(lines: &[&str]) -> RegexTemplate {
        RegexTemplate {
            line_start: "^Items$".to_string(),
            line_end: Some("^Total".to_string()),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            columns: vec!["qty".to_string(), "desc".to_string()],
        }
    }

    #[test]
    fn test_continuation_appends_to_record() {
        let ctx = lines(&["Items", "3 Widget", "  extra note", "Total 30.00"]);
        let template = template(&[r"(?P<qty>\d+) (?P<desc>.+)", r"  (?P<desc>.+)"]);

        let output = RegexExtractor::new(&ctx).extract(&template).unwrap();
        let expected: LineItem = [("qty", "3"), ("desc", "Widget\nextra note")].into_iter().collect();
        assert_eq!(output.items, vec![expected]);
    }

    #[test]
    fn test_continuations_are_used_once_in_order() {
        let ctx = lines(&[
            "Items",
            "1 Bolt",
            "  steel",
            "  zinc plated",
            "2 Nut",
            "  brass",
            "Total 3.00",
        ]);
        let template = template(&[r"^(?P<qty>\d+) (?P<desc>.+)", r"^  (?P<desc>.+)"]);

        let output = RegexExtractor::new(&ctx).extract(&template).unwrap();
        let descs: Vec<Option<&str>> = output.items.iter().map(|i| i.get("desc")).collect();
        assert_eq!(descs, vec![Some("Bolt\nsteel"), Some("Nut\nbrass")]);
    }

    #[test]
    fn test_rows_before_first_record_are_ignored() {
        let ctx = lines(&["Items", "  orphan", "5 Washer", "Total"]);
        let template = template(&[r"^(?P<qty>\d+) (?P<desc>.+)", r"^  (?P<desc>.+)"]);

        let output = RegexExtractor::new(&ctx).extract(&template).unwrap();
        assert_eq!(output.items.len(), 1);
        assert_eq!(output.items[0].get("desc"), Some("Washer"));
    }

    #[test]
    fn test_missing_start_is_not_found() {
        let ctx = lines(&["3 Widget"]);
        let template = template(&[r"(?P<qty>\d+) (?P<desc>.+)"]);

        let err = RegexExtractor::new(&ctx).extract(&template).unwrap_err();
        assert!(matches!(err, crate::InvexError::Extraction(e) if e.is_not_found()));
    }

    #[test]
    fn test_bad_pattern_propagates() {
        let ctx = lines(&["Items", "3 Widget"]);
        let template = template(&[r"(?P<qty>\d+"]);

        let err = RegexExtractor::new(&ctx).extract(&template).unwrap_err();
        assert!(matches!(err, crate::InvexError::Regex(_)));
    }
}

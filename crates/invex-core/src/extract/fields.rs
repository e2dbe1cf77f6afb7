//! Single-value fields and keyword presence.

use std::collections::BTreeSet;

use regex::Regex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::layout::LayoutContext;
use crate::locate::{TextLocation, TextLocator};
use crate::models::template::{Anchor, Direction, FieldSpec};

/// Resolves [`FieldSpec`]s against a document.
#[derive(Debug, Clone, Copy)]
pub struct FieldFinder<'a> {
    ctx: &'a LayoutContext,
    locator: TextLocator<'a>,
}

impl<'a> FieldFinder<'a> {
    pub fn new(ctx: &'a LayoutContext) -> Self {
        Self {
            ctx,
            locator: TextLocator::new(ctx),
        }
    }

    /// Value of one field, or `None` when nothing non-empty was found.
    pub fn find_field(&self, spec: &FieldSpec) -> Result<Option<String>> {
        let candidates: Vec<String> = match (spec.location.anchor(), spec.location.direction()) {
            (Anchor::Keyword, None) => self
                .locator
                .search_keyword(&spec.identifier)
                .into_iter()
                .map(|_| spec.identifier.clone())
                .collect(),
            (Anchor::Regex, None) => self
                .locator
                .search_regex(&Regex::new(&spec.identifier)?)
                .into_iter()
                .map(|hit| hit.capture)
                .collect(),
            (anchor, Some(direction)) => {
                let anchors: Vec<TextLocation> = match anchor {
                    Anchor::Keyword => self.locator.search_keyword(&spec.identifier),
                    Anchor::Regex => self
                        .locator
                        .search_regex(&Regex::new(&spec.identifier)?)
                        .into_iter()
                        .map(|hit| hit.location)
                        .collect(),
                };
                anchors
                    .iter()
                    .map(|loc| match direction {
                        Direction::Bottom => self.locator.text_at_bottom(loc),
                        Direction::Right(position) => self.locator.text_to_right(position, loc),
                    })
                    .collect()
            }
        };

        let pick = spec.ordinal.unwrap_or(1).saturating_sub(1);
        let value = candidates.into_iter().filter(|text| !text.is_empty()).nth(pick);
        trace!("Field {:?} -> {:?}", spec.name, value);
        Ok(value)
    }

    /// Whether every keyword occurs as a substring of some run.
    pub fn keywords_present(&self, keywords: &[String]) -> bool {
        let mut remaining: BTreeSet<&str> = keywords.iter().map(String::as_str).collect();
        if remaining.is_empty() {
            return true;
        }

        for page in self.ctx.pages() {
            for (_, row) in page.rows_top_down() {
                for run in row.runs() {
                    remaining.retain(|keyword| !run.text.contains(keyword));
                    if remaining.is_empty() {
                        return true;
                    }
                }
            }
        }

        debug!("Missing keywords: {:?}", remaining);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BBox;
    use crate::models::config::LayoutConfig;
    use crate::models::primitive::Primitive;
    use crate::models::template::Location;
    use pretty_assertions::assert_eq;

    fn word(x0: f64, y1: f64, x1: f64, text: &str) -> Primitive {
        Primitive::word(BBox::new(x0, y1 - 10.0, x1, y1), text)
    }

    fn invoice() -> LayoutContext {
        let page = vec![
            word(50.0, 750.0, 140.0, "ACME Supplies"),
            word(400.0, 750.0, 470.0, "Invoice no:"),
            word(480.0, 750.0, 540.0, "INV-0042"),
            word(50.0, 700.0, 100.0, "Date"),
            word(50.0, 685.0, 110.0, "2024-03-01"),
            word(400.0, 650.0, 450.0, "Total"),
            word(460.0, 650.0, 500.0, "EUR"),
            word(510.0, 650.0, 560.0, "1,250.00"),
            word(400.0, 600.0, 450.0, "Total"),
            word(460.0, 600.0, 500.0, "EUR"),
            word(510.0, 600.0, 560.0, "99.00"),
        ];
        LayoutContext::from_pages(&[page], &LayoutConfig::default()).unwrap()
    }

    fn spec(location: Location, identifier: &str, ordinal: Option<usize>) -> FieldSpec {
        FieldSpec {
            name: "field".to_string(),
            location,
            identifier: identifier.to_string(),
            ordinal,
        }
    }

    #[test]
    fn test_each_location_kind() {
        let ctx = invoice();
        let finder = FieldFinder::new(&ctx);
        let find = |s: FieldSpec| finder.find_field(&s).unwrap();

        assert_eq!(find(spec(Location::Right, "Invoice no:", None)), Some("INV-0042".to_string()));
        assert_eq!(find(spec(Location::Bottom, "Date", None)), Some("2024-03-01".to_string()));
        assert_eq!(find(spec(Location::SecondRight, "Total", None)), Some("1,250.00".to_string()));
        assert_eq!(find(spec(Location::Regex, r"INV-(\d+)", None)), Some("0042".to_string()));
        assert_eq!(
            find(spec(Location::RegexRight, r"^Invoice", None)),
            Some("INV-0042".to_string())
        );
        assert_eq!(find(spec(Location::Keyword, "EUR", None)), Some("EUR".to_string()));
    }

    #[test]
    fn test_ordinal_picks_among_anchors() {
        let ctx = invoice();
        let finder = FieldFinder::new(&ctx);

        let second = finder.find_field(&spec(Location::SecondRight, "Total", Some(2))).unwrap();
        assert_eq!(second, Some("99.00".to_string()));

        let third = finder.find_field(&spec(Location::SecondRight, "Total", Some(3))).unwrap();
        assert_eq!(third, None);
    }

    #[test]
    fn test_empty_captures_are_skipped() {
        let ctx = invoice();
        let value = FieldFinder::new(&ctx)
            .find_field(&spec(Location::Regex, r"^(\d*)[\d,]+\.\d\d$", None))
            .unwrap();
        // "1,250.00" captures "1" while "99.00" captures "99"; neither is empty
        assert_eq!(value, Some("1".to_string()));

        let none = FieldFinder::new(&ctx)
            .find_field(&spec(Location::Regex, r"^Date()$", None))
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_missing_anchor_is_none() {
        let ctx = invoice();
        let value = FieldFinder::new(&ctx)
            .find_field(&spec(Location::Right, "Due date", None))
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let ctx = invoice();
        let err = FieldFinder::new(&ctx)
            .find_field(&spec(Location::RegexBottom, "(", None))
            .unwrap_err();
        assert!(matches!(err, crate::InvexError::Regex(_)));
    }

    #[test]
    fn test_keywords_present() {
        let ctx = invoice();
        let finder = FieldFinder::new(&ctx);
        let keys = |ks: &[&str]| ks.iter().map(|k| k.to_string()).collect::<Vec<_>>();

        assert!(finder.keywords_present(&keys(&["ACME", "INV-"])));
        assert!(finder.keywords_present(&[]));
        assert!(!finder.keywords_present(&keys(&["ACME", "Globex"])));
    }
}

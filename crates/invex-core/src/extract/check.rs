//! Invoice total verification.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::Result;
use crate::models::output::{CheckStatus, Extraction};
use crate::models::template::{CheckSpec, CheckTarget};

/// Why a value could not be turned into a number.
enum Rejection {
    Mismatch,
    MissingGroup,
    Conversion,
}

/// Pulls numbers out of field or line-item text.
struct Amount {
    pattern: Option<Regex>,
}

impl Amount {
    fn new(target: &CheckTarget) -> Result<Self> {
        Ok(Self {
            pattern: target.regex.as_deref().map(Regex::new).transpose()?,
        })
    }

    fn parse(&self, text: &str) -> std::result::Result<Decimal, Rejection> {
        let raw = match &self.pattern {
            Some(pattern) => {
                let caps = pattern.captures(text).ok_or(Rejection::Mismatch)?;
                caps.name("Total").ok_or(Rejection::MissingGroup)?.as_str()
            }
            None => text,
        };
        Decimal::from_str(raw.replace(',', "").trim()).map_err(|_| Rejection::Conversion)
    }
}

/// Compare a total field with the sum of one line-item column.
///
/// Line items without the column are left out of the sum.
pub fn check_totals(spec: &CheckSpec, extraction: &Extraction, precision: u32) -> Result<CheckStatus> {
    let field = Amount::new(&spec.field)?;
    let lineitem = Amount::new(&spec.lineitem)?;

    let Some(field_text) = extraction.fields.get(&spec.field.name) else {
        return Ok(CheckStatus::failed("Field value cannot be empty"));
    };
    let total = match field.parse(field_text) {
        Ok(total) => total,
        Err(rejection) => return Ok(rejected(rejection, "field")),
    };

    let mut sum = Decimal::ZERO;
    for item in &extraction.lineitems {
        let Some(text) = item.get(&spec.lineitem.name) else {
            continue;
        };
        match lineitem.parse(text) {
            Ok(value) => sum += value,
            Err(rejection) => return Ok(rejected(rejection, "lineitem")),
        }
    }

    let status = if total.round_dp(precision) == sum.round_dp(precision) {
        CheckStatus::passed()
    } else {
        CheckStatus::failed(format!("{} != {}", total.normalize(), sum.normalize()))
    };
    debug!("Total check: {:?}", status);
    Ok(status)
}

fn rejected(rejection: Rejection, side: &str) -> CheckStatus {
    match rejection {
        Rejection::Mismatch => CheckStatus::failed(format!("{side} regex pattern mismatch")),
        Rejection::MissingGroup => CheckStatus::failed("regex Total lookup failed"),
        Rejection::Conversion => CheckStatus::failed("Conversion error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::output::LineItem;
    use pretty_assertions::assert_eq;

    fn target(name: &str, regex: Option<&str>) -> CheckTarget {
        CheckTarget {
            name: name.to_string(),
            regex: regex.map(str::to_string),
        }
    }

    fn extraction(total: &str, amounts: &[&str]) -> Extraction {
        let mut extraction = Extraction::default();
        extraction.fields.insert("total".to_string(), total.to_string());
        extraction.lineitems = amounts
            .iter()
            .map(|a| [("amount", *a)].into_iter().collect::<LineItem>())
            .collect();
        extraction
    }

    fn plain() -> CheckSpec {
        CheckSpec {
            field: target("total", None),
            lineitem: target("amount", None),
        }
    }

    #[test]
    fn test_matching_total_passes() {
        let status = check_totals(&plain(), &extraction("1,030.50", &["1,000.25", "30.25"]), 2).unwrap();
        assert_eq!(status, CheckStatus::passed());
    }

    #[test]
    fn test_mismatch_describes_both_sides() {
        let status = check_totals(&plain(), &extraction("100.00", &["40.00", "50.50"]), 2).unwrap();
        assert_eq!(status, CheckStatus::failed("100 != 90.5"));
    }

    #[test]
    fn test_precision_controls_rounding() {
        let data = extraction("10.004", &["10.001"]);
        assert!(check_totals(&plain(), &data, 2).unwrap().is_passed());
        assert!(!check_totals(&plain(), &data, 3).unwrap().is_passed());
    }

    #[test]
    fn test_regex_extracts_total_group() {
        let spec = CheckSpec {
            field: target("total", Some(r"EUR (?P<Total>[\d.,]+)")),
            lineitem: target("amount", Some(r"(?P<Total>[\d.,]+) EUR")),
        };
        let status = check_totals(&spec, &extraction("EUR 15.00", &["5.00 EUR", "10.00 EUR"]), 2).unwrap();
        assert!(status.is_passed());

        let mismatch = check_totals(&spec, &extraction("USD 15.00", &["15.00 EUR"]), 2).unwrap();
        assert_eq!(mismatch, CheckStatus::failed("field regex pattern mismatch"));

        let bad_item = check_totals(&spec, &extraction("EUR 15.00", &["15.00 USD"]), 2).unwrap();
        assert_eq!(bad_item, CheckStatus::failed("lineitem regex pattern mismatch"));
    }

    #[test]
    fn test_failure_descriptions() {
        let missing = check_totals(&plain(), &Extraction::default(), 2).unwrap();
        assert_eq!(missing, CheckStatus::failed("Field value cannot be empty"));

        let garbled = check_totals(&plain(), &extraction("n/a", &["1.00"]), 2).unwrap();
        assert_eq!(garbled, CheckStatus::failed("Conversion error"));

        let spec = CheckSpec {
            field: target("total", Some(r"(?P<Sum>\d+)")),
            lineitem: target("amount", None),
        };
        let no_group = check_totals(&spec, &extraction("12", &["12"]), 2).unwrap();
        assert_eq!(no_group, CheckStatus::failed("regex Total lookup failed"));
    }
}

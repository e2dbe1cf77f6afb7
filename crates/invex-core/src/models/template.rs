//! Extraction templates.
//!
//! A template names the fields to pull from a document, how to find each
//! one, and optionally how to rebuild a line-item table and verify totals.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, TemplateError};
use crate::locate::RightPosition;

/// A complete extraction template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Display name, usually the file stem.
    #[serde(default)]
    pub name: String,

    /// Every keyword must occur in a document for the template to apply.
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_lineitems: Option<TableTemplate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_lineitems: Option<RegexTemplate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<CheckSpec>,
}

/// How to find one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub location: Location,
    /// Keyword text or regex pattern, depending on `location`.
    pub identifier: String,
    /// 1-based pick among several candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
}

/// Where a field value sits relative to its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Location {
    /// The identifier text itself.
    Keyword,
    /// Capture group 1 of the identifier pattern.
    Regex,
    Bottom,
    Right,
    SecondRight,
    RegexBottom,
    RegexRight,
    RegexSecondRight,
}

/// How the anchor of a field is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Keyword,
    Regex,
}

/// Which neighbour of the anchor holds the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Bottom,
    Right(RightPosition),
}

impl Location {
    pub fn anchor(self) -> Anchor {
        match self {
            Location::Keyword | Location::Bottom | Location::Right | Location::SecondRight => {
                Anchor::Keyword
            }
            Location::Regex
            | Location::RegexBottom
            | Location::RegexRight
            | Location::RegexSecondRight => Anchor::Regex,
        }
    }

    /// `None` when the value is the anchor match itself.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Location::Keyword | Location::Regex => None,
            Location::Bottom | Location::RegexBottom => Some(Direction::Bottom),
            Location::Right | Location::RegexRight => Some(Direction::Right(RightPosition::First)),
            Location::SecondRight | Location::RegexSecondRight => {
                Some(Direction::Right(RightPosition::Second))
            }
        }
    }
}

/// A line-item table located by its column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableTemplate {
    pub columns: Vec<ColumnTemplate>,
    /// Columns are separated by vertical rules.
    #[serde(default)]
    pub vertical_lines: bool,
    /// Line items are separated by horizontal rules.
    #[serde(default)]
    pub horizontal_lines: bool,
    /// Pattern of the first row after the table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<String>,
}

/// A column as written in the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTemplate {
    /// Header text; embedded line breaks separate printed lines.
    pub name: String,
    #[serde(default = "default_alignment")]
    pub alignment: String,
    /// Text in this column marks the first row of a line item.
    #[serde(default)]
    pub row_start: bool,
}

fn default_alignment() -> String {
    "left".to_string()
}

/// Horizontal alignment of a column's cells under its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl std::str::FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "center" | "centre" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            other => Err(other.to_string()),
        }
    }
}

/// A column ready for extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Full template name, used as the output key.
    pub name: String,
    /// One entry per printed header line.
    pub fragments: Vec<String>,
    pub alignment: Alignment,
    pub row_start: bool,
}

impl ColumnTemplate {
    /// Resolve the alignment and split the header into fragments.
    pub fn resolve(&self) -> Result<ColumnSpec, ExtractionError> {
        let alignment = self
            .alignment
            .parse()
            .map_err(|alignment| ExtractionError::UnsupportedAlignment {
                column: self.name.clone(),
                alignment,
            })?;

        Ok(ColumnSpec {
            name: self.name.clone(),
            fragments: self.name.split('\n').map(|f| f.trim().to_string()).collect(),
            alignment,
            row_start: self.row_start,
        })
    }
}

impl TableTemplate {
    /// Resolve every column, failing on the first unusable one.
    pub fn resolve_columns(&self) -> Result<Vec<ColumnSpec>, ExtractionError> {
        if self.columns.is_empty() {
            return Err(ExtractionError::NoColumns);
        }
        self.columns.iter().map(ColumnTemplate::resolve).collect()
    }
}

/// Line items matched by an ordered list of patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexTemplate {
    /// Pattern of the row where line items begin (excluded).
    pub line_start: String,
    /// Pattern of the row where line items end (excluded).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<String>,
    /// Primary pattern first, then continuation patterns in order.
    pub lines: Vec<String>,
    /// Named groups copied into each line item.
    pub columns: Vec<String>,
}

/// Verifies that line items add up to a total field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSpec {
    pub field: CheckTarget,
    pub lineitem: CheckTarget,
}

/// A value taking part in a total check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckTarget {
    pub name: String,
    /// Pattern whose `Total` group holds the number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl Template {
    /// Parse and validate a template.
    pub fn from_json(name: &str, json: &str) -> Result<Self, TemplateError> {
        let mut template: Template =
            serde_json::from_str(json).map_err(|e| TemplateError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        if template.name.is_empty() {
            template.name = name.to_string();
        }
        template.validate()?;
        Ok(template)
    }

    /// Load a template file, naming it after the file stem.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_json(&name, &json)?)
    }

    /// Check constraints serde cannot express.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |reason: String| TemplateError::Invalid {
            name: self.name.clone(),
            reason,
        };

        for field in &self.fields {
            if field.identifier.is_empty() {
                return Err(invalid(format!("field {:?} has an empty identifier", field.name)));
            }
            if field.ordinal == Some(0) {
                return Err(invalid(format!("field {:?}: ordinals start at 1", field.name)));
            }
        }

        if let Some(regex) = &self.regex_lineitems {
            if regex.lines.is_empty() {
                return Err(invalid("regex_lineitems.lines is empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = r#"{
        "keywords": ["ACME Corp", "Invoice"],
        "fields": [
            {"name": "invoice_number", "location": "right", "identifier": "Invoice No:"},
            {"name": "date", "location": "regex", "identifier": "Date: (\\S+)", "ordinal": 2},
            {"name": "total", "location": "regex-second-right", "identifier": "^Total"}
        ],
        "table_lineitems": {
            "columns": [
                {"name": "Description", "row_start": true},
                {"name": "Unit\nPrice", "alignment": "right"}
            ],
            "horizontal_lines": true,
            "line_end": "^Total"
        },
        "check": {
            "field": {"name": "total"},
            "lineitem": {"name": "Unit\nPrice"}
        }
    }"#;

    #[test]
    fn test_parse_template() {
        let template = Template::from_json("acme", TEMPLATE).unwrap();

        assert_eq!(template.name, "acme");
        assert_eq!(template.fields[1].ordinal, Some(2));
        assert_eq!(template.fields[2].location, Location::RegexSecondRight);

        let table = template.table_lineitems.as_ref().unwrap();
        assert!(table.horizontal_lines);
        assert!(!table.vertical_lines);

        let columns = table.resolve_columns().unwrap();
        assert_eq!(columns[0].alignment, Alignment::Left);
        assert_eq!(columns[1].fragments, vec!["Unit", "Price"]);
        assert_eq!(columns[1].name, "Unit\nPrice");
    }

    #[test]
    fn test_location_decomposition() {
        assert_eq!(Location::Keyword.direction(), None);
        assert_eq!(Location::RegexBottom.anchor(), Anchor::Regex);
        assert_eq!(
            Location::SecondRight.direction(),
            Some(Direction::Right(RightPosition::Second))
        );
    }

    #[test]
    fn test_unknown_location_is_rejected() {
        let json = r#"{"fields": [{"name": "x", "location": "left", "identifier": "X"}]}"#;
        assert!(matches!(
            Template::from_json("bad", json),
            Err(TemplateError::Invalid { .. })
        ));
    }

    #[test]
    fn test_unsupported_alignment_fails_only_on_resolve() {
        let json = r#"{"table_lineitems": {"columns": [{"name": "Qty", "alignment": "justify"}]}}"#;
        let template = Template::from_json("odd", json).unwrap();

        let err = template.table_lineitems.unwrap().resolve_columns().unwrap_err();
        assert_eq!(
            err,
            ExtractionError::UnsupportedAlignment {
                column: "Qty".to_string(),
                alignment: "justify".to_string(),
            }
        );
    }

    #[test]
    fn test_zero_ordinal_is_invalid() {
        let json = r#"{"fields": [{"name": "x", "location": "regex", "identifier": "(a)", "ordinal": 0}]}"#;
        assert!(Template::from_json("zero", json).is_err());
    }
}

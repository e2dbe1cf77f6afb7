//! Extraction output.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One reconstructed line item: column name to text.
///
/// Multiple contributions to one column are joined by line breaks in the
/// order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItem(IndexMap<String, String>);

impl LineItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add text to a column, joining with a line break if it already has some.
    pub fn append(&mut self, column: &str, text: &str) {
        match self.0.get_mut(column) {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(text);
            }
            None => {
                self.0.insert(column.to_string(), text.to_string());
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut String)> + '_ {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LineItem {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut item = LineItem::new();
        for (k, v) in iter {
            item.append(&k.into(), &v.into());
        }
        item
    }
}

/// Outcome of a total check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatus {
    pub match_status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CheckStatus {
    pub fn passed() -> Self {
        Self {
            match_status: MatchStatus {
                status: true,
                description: None,
            },
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            match_status: MatchStatus {
                status: false,
                description: Some(description.into()),
            },
        }
    }

    pub fn is_passed(&self) -> bool {
        self.match_status.status
    }
}

/// Fields and line items of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Field name to text, in template order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lineitems: Vec<LineItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkstatus: Option<CheckStatus>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.lineitems.is_empty()
    }
}

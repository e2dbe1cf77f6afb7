//! Value post-processing hooks.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::output::Extraction;

lazy_static! {
    static ref BLANKS: Regex = Regex::new(r"[ \t\u{00a0}]+").unwrap();
}

/// Rewrites extracted values before totals are checked.
///
/// Every method defaults to leaving its input unchanged.
pub trait ValueHook: Send + Sync {
    fn transform_field(&self, _name: &str, value: String) -> String {
        value
    }

    fn transform_line_item(&self, _index: usize, _column: &str, value: String) -> String {
        value
    }

    /// Runs once after every other step, including the total check.
    fn post_process(&self, _extraction: &mut Extraction) {}
}

/// Collapses blank runs inside each line and trims every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceNormalizer;

impl WhitespaceNormalizer {
    pub fn normalize(value: &str) -> String {
        value
            .split('\n')
            .map(|line| BLANKS.replace_all(line.trim(), " "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ValueHook for WhitespaceNormalizer {
    fn transform_field(&self, _name: &str, value: String) -> String {
        Self::normalize(&value)
    }

    fn transform_line_item(&self, _index: usize, _column: &str, value: String) -> String {
        Self::normalize(&value)
    }
}

/// Apply the field and line-item transforms of `hooks` in order.
pub(crate) fn apply(hooks: &[Box<dyn ValueHook>], extraction: &mut Extraction) {
    if hooks.is_empty() {
        return;
    }
    for (name, value) in extraction.fields.iter_mut() {
        *value = hooks
            .iter()
            .fold(std::mem::take(value), |v, hook| hook.transform_field(name, v));
    }
    for (index, item) in extraction.lineitems.iter_mut().enumerate() {
        for (column, value) in item.iter_mut() {
            *value = hooks
                .iter()
                .fold(std::mem::take(value), |v, hook| hook.transform_line_item(index, column, v));
        }
    }
}

//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Layout index construction.
    pub layout: LayoutConfig,

    /// Table line-item extraction.
    pub table: TableConfig,

    /// Total verification.
    pub check: CheckConfig,

    /// Output post-processing.
    pub extraction: ExtractionConfig,
}

/// Layout index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Maximum horizontal gap (points) between characters merged into one run.
    pub character_closeness: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            character_closeness: 2.0,
        }
    }
}

/// Table extraction tolerances, all in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows within this distance of the end row terminate the region.
    pub end_location_margin: f64,

    /// Minimum row gap for a horizontal rule to close a line item.
    pub horizontal_line_margin: f64,

    /// Tolerance for left/right column alignment.
    pub alignment_margin: f64,

    /// Rows closer than this to the previous row continue it.
    pub row_closeness: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            end_location_margin: 5.0,
            horizontal_line_margin: 5.0,
            alignment_margin: 5.0,
            row_closeness: 3.0,
        }
    }
}

/// Total verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Decimal places compared when checking totals.
    pub precision_digits: u32,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            precision_digits: 2,
        }
    }
}

/// Output post-processing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Collapse repeated blanks and trim every extracted line.
    pub normalize_whitespace: bool,
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: InvexConfig =
            serde_json::from_str(r#"{"table": {"row_closeness": 4.5}}"#).unwrap();

        assert_eq!(config.table.row_closeness, 4.5);
        assert_eq!(config.table.alignment_margin, 5.0);
        assert_eq!(config.layout.character_closeness, 2.0);
        assert_eq!(config.check.precision_digits, 2);
        assert!(!config.extraction.normalize_whitespace);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = InvexConfig::default();
        config.check.precision_digits = 3;
        config.save(&path).unwrap();

        let loaded = InvexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.check.precision_digits, 3);
    }
}

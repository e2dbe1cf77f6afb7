//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// The layout index could not be built consistently.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Field or line-item extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Template loading or validation error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// A template pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural errors raised while building the layout index.
///
/// These abort the whole document.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The per-page maps disagree on the number of pages.
    #[error(
        "page count mismatch: top={top}, bottom={bottom}, horizontal={horizontal}, vertical={vertical}"
    )]
    PageCountMismatch {
        top: usize,
        bottom: usize,
        horizontal: usize,
        vertical: usize,
    },

    /// A primitive was pushed before any page was started.
    #[error("primitive received outside of a page")]
    NoOpenPage,
}

/// Errors raised while locating regions and extracting line items.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// No page completed the table header.
    #[error("table header not found")]
    HeaderNotFound,

    /// The line-item start pattern matched no row.
    #[error("line-item start not found for pattern {0:?}")]
    RegionStartNotFound(String),

    /// The line-item end pattern matched no row after the start.
    #[error("line-item end not found for pattern {0:?}")]
    RegionEndNotFound(String),

    /// The computed end row is not strictly after the start row.
    #[error(
        "invalid line-item region: end (page {end_page}, y {end_y}) is not after start (page {start_page}, y {start_y})"
    )]
    InvalidRegion {
        start_page: usize,
        start_y: f64,
        end_page: usize,
        end_y: f64,
    },

    /// A column declares an alignment that is not left, center or right.
    #[error("unsupported alignment {alignment:?} for column {column:?}")]
    UnsupportedAlignment { column: String, alignment: String },

    /// The table declares no columns.
    #[error("table template declares no columns")]
    NoColumns,
}

impl ExtractionError {
    /// Whether the error means "nothing to extract" rather than a broken template.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::HeaderNotFound | Self::RegionStartNotFound(_) | Self::RegionEndNotFound(_)
        )
    }

    /// Whether the error comes from an inconsistent template.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegion { .. } | Self::UnsupportedAlignment { .. } | Self::NoColumns
        )
    }
}

/// Errors related to template files.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template JSON does not match the expected schema.
    #[error("invalid template {name}: {reason}")]
    Invalid { name: String, reason: String },

    /// No template matched the document's keywords.
    #[error("no template matched {document}")]
    NoMatch { document: String },
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to interpret page content.
    #[error("failed to read page content: {0}")]
    Content(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;

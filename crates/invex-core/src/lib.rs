//! Core library for template-driven invoice extraction.
//!
//! This crate provides:
//! - A layout index over positioned text runs and ruling lines
//! - Keyword and regex location with directional navigation
//! - Table line items rebuilt from column headers
//! - Regex line items and total verification
//! - PDF primitive extraction (feature `native`)

pub mod error;
pub mod extract;
pub mod layout;
pub mod locate;
pub mod models;
pub mod pdf;

pub use error::{ExtractionError, InvexError, LayoutError, PdfError, Result, TemplateError};
pub use extract::{
    select_template, ExtractionResult, FieldFinder, LayoutExtractor, TemplateExtractor, ValueHook,
    WhitespaceNormalizer,
};
pub use layout::{BBox, LayoutBuilder, LayoutContext};
pub use models::config::InvexConfig;
pub use models::output::{CheckStatus, Extraction, LineItem};
pub use models::primitive::{Primitive, PrimitiveDocument};
pub use models::template::Template;
pub use pdf::PrimitiveSource;

#[cfg(feature = "native")]
pub use pdf::PdfExtractor;

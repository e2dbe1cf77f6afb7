//! Sources of positioned primitives.

#[cfg(feature = "native")]
mod extractor;

#[cfg(feature = "native")]
pub use extractor::PdfExtractor;

use crate::error::Result;
use crate::layout::LayoutContext;
use crate::models::config::LayoutConfig;
use crate::models::primitive::{Primitive, PrimitiveDocument};

/// Anything that can produce per-page primitives for the layout index.
pub trait PrimitiveSource {
    /// Primitives of every page, in page order.
    fn primitive_pages(&self) -> Result<Vec<Vec<Primitive>>>;

    /// Build the layout index from this source.
    fn layout(&self, config: &LayoutConfig) -> Result<LayoutContext> {
        let pages = self.primitive_pages()?;
        Ok(LayoutContext::from_pages(&pages, config)?)
    }
}

impl PrimitiveSource for PrimitiveDocument {
    fn primitive_pages(&self) -> Result<Vec<Vec<Primitive>>> {
        Ok(self.pages.clone())
    }

    fn layout(&self, config: &LayoutConfig) -> Result<LayoutContext> {
        Ok(LayoutContext::from_pages(&self.pages, config)?)
    }
}

//! Template-driven extraction of fields and line items.

mod check;
mod fields;
mod hooks;
mod regex_items;
mod select;
mod table;

pub use check::check_totals;
pub use fields::FieldFinder;
pub use hooks::{ValueHook, WhitespaceNormalizer};
pub use regex_items::RegexExtractor;
pub use select::select_template;
pub use table::TableExtractor;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{InvexError, Result};
use crate::layout::LayoutContext;
use crate::models::config::InvexConfig;
use crate::models::output::{Extraction, LineItem};
use crate::models::template::Template;

/// Line items of one table or regex region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemOutput {
    pub items: Vec<LineItem>,
    /// Rows that could not be placed.
    pub warnings: Vec<String>,
}

/// Result of extracting one document with one template.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub extraction: Extraction,
    /// Name of the template used.
    pub template: String,
    /// Values and regions that could not be found.
    pub warnings: Vec<String>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Wall-clock timer; `std::time::Instant` is unavailable on wasm32.
struct Stopwatch {
    #[cfg(not(target_arch = "wasm32"))]
    start: std::time::Instant,
}

impl Stopwatch {
    fn start() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            start: std::time::Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        #[cfg(not(target_arch = "wasm32"))]
        return self.start.elapsed().as_millis() as u64;
        #[cfg(target_arch = "wasm32")]
        return 0;
    }
}

/// Trait for extracting a document with a template.
pub trait LayoutExtractor {
    fn extract(&self, ctx: &LayoutContext, template: &Template) -> Result<ExtractionResult>;
}

/// Runs fields, line items, hooks and the total check in that order.
pub struct TemplateExtractor {
    config: InvexConfig,
    hooks: Vec<Box<dyn ValueHook>>,
}

impl TemplateExtractor {
    pub fn new() -> Self {
        Self {
            config: InvexConfig::default(),
            hooks: Vec::new(),
        }
    }

    /// Use `config`, adding the whitespace hook when it asks for one.
    pub fn with_config(mut self, config: InvexConfig) -> Self {
        if config.extraction.normalize_whitespace {
            self.hooks.insert(0, Box::new(WhitespaceNormalizer));
        }
        self.config = config;
        self
    }

    pub fn with_hook(mut self, hook: impl ValueHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn config(&self) -> &InvexConfig {
        &self.config
    }

    fn extract_fields(&self, ctx: &LayoutContext, template: &Template, extraction: &mut Extraction, warnings: &mut Vec<String>) -> Result<()> {
        let finder = FieldFinder::new(ctx);
        for spec in &template.fields {
            match finder.find_field(spec)? {
                Some(value) => {
                    extraction.fields.insert(spec.name.clone(), value);
                }
                None => warnings.push(format!("Field '{}' not found", spec.name)),
            }
        }
        Ok(())
    }

    fn extract_line_items(&self, ctx: &LayoutContext, template: &Template) -> Result<Option<LineItemOutput>> {
        let output = if let Some(table) = &template.table_lineitems {
            TableExtractor::new(ctx).with_config(self.config.table.clone()).extract(table)
        } else if let Some(regex) = &template.regex_lineitems {
            RegexExtractor::new(ctx)
                .with_end_margin(self.config.table.end_location_margin)
                .extract(regex)
        } else {
            return Ok(None);
        };
        output.map(Some)
    }
}

impl Default for TemplateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutExtractor for TemplateExtractor {
    fn extract(&self, ctx: &LayoutContext, template: &Template) -> Result<ExtractionResult> {
        let timer = Stopwatch::start();
        let mut extraction = Extraction::default();
        let mut warnings = Vec::new();

        info!("Extracting {} pages with template {:?}", ctx.page_count(), template.name);

        self.extract_fields(ctx, template, &mut extraction, &mut warnings)?;

        match self.extract_line_items(ctx, template) {
            Ok(Some(output)) => {
                if output.items.is_empty() {
                    warnings.push("No line items found".to_string());
                }
                extraction.lineitems = output.items;
                warnings.extend(output.warnings);
            }
            Ok(None) => {}
            Err(InvexError::Extraction(e)) if e.is_not_found() || e.is_configuration() => {
                warn!("Line items skipped: {}", e);
                warnings.push(e.to_string());
            }
            Err(e) => return Err(e),
        }

        hooks::apply(&self.hooks, &mut extraction);

        if let Some(spec) = &template.check {
            extraction.checkstatus = Some(check_totals(spec, &extraction, self.config.check.precision_digits)?);
        }

        for hook in &self.hooks {
            hook.post_process(&mut extraction);
        }

        let processing_time_ms = timer.elapsed_ms();
        info!(
            "Extracted {} fields and {} line items in {}ms",
            extraction.fields.len(),
            extraction.lineitems.len(),
            processing_time_ms
        );

        Ok(ExtractionResult {
            extraction,
            template: template.name.clone(),
            warnings,
            processing_time_ms,
        })
    }
}

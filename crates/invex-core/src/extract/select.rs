//! Template selection by keyword presence.

use tracing::{debug, info};

use super::fields::FieldFinder;
use crate::layout::LayoutContext;
use crate::models::template::Template;

/// First template whose keywords all occur in the document.
pub fn select_template<'t>(ctx: &LayoutContext, templates: &'t [Template]) -> Option<&'t Template> {
    let finder = FieldFinder::new(ctx);
    let chosen = templates.iter().find(|template| {
        let present = finder.keywords_present(&template.keywords);
        debug!("Template {:?} keywords present: {}", template.name, present);
        present
    });
    if let Some(template) = chosen {
        info!("Selected template {:?}", template.name);
    }
    chosen
}

//! WASM bindings for template-driven invoice extraction.
//!
//! Primitives and templates cross the boundary as plain JS objects with the
//! same shape as their JSON files.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use invex_core::models::config::InvexConfig;
use invex_core::{
    select_template, ExtractionResult, FieldFinder, LayoutContext, LayoutExtractor, PrimitiveDocument, Template,
    TemplateExtractor,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_config(config: Option<JsValue>) -> Result<InvexConfig, JsValue> {
    match config {
        Some(value) if !value.is_undefined() && !value.is_null() => {
            serde_wasm_bindgen::from_value(value).map_err(js_error)
        }
        _ => Ok(InvexConfig::default()),
    }
}

fn parse_template(template: JsValue) -> Result<Template, JsValue> {
    let template: Template = serde_wasm_bindgen::from_value(template).map_err(js_error)?;
    template.validate().map_err(js_error)?;
    Ok(template)
}

fn build_layout(primitives: JsValue, config: &InvexConfig) -> Result<LayoutContext, JsValue> {
    let doc: PrimitiveDocument = serde_wasm_bindgen::from_value(primitives).map_err(js_error)?;
    LayoutContext::from_pages(&doc.pages, &config.layout).map_err(js_error)
}

fn report(result: &ExtractionResult) -> Result<JsValue, JsValue> {
    for warning in &result.warnings {
        web_sys::console::warn_1(&JsValue::from_str(warning));
    }
    result
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

/// Extract one document with one template.
///
/// Returns `{extraction, template, warnings, processing_time_ms}`.
#[wasm_bindgen]
pub fn extract(primitives: JsValue, template: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let config = parse_config(config)?;
    let template = parse_template(template)?;
    let ctx = build_layout(primitives, &config)?;

    let result = TemplateExtractor::new()
        .with_config(config)
        .extract(&ctx, &template)
        .map_err(js_error)?;
    report(&result)
}

/// Whether every keyword occurs somewhere in the document.
#[wasm_bindgen(js_name = keywordsPresent)]
pub fn keywords_present(primitives: JsValue, keywords: Vec<String>) -> Result<bool, JsValue> {
    let ctx = build_layout(primitives, &InvexConfig::default())?;
    Ok(FieldFinder::new(&ctx).keywords_present(&keywords))
}

/// A document indexed once and extracted with any number of templates.
#[wasm_bindgen]
pub struct LayoutDocument {
    ctx: LayoutContext,
    config: InvexConfig,
}

#[wasm_bindgen]
impl LayoutDocument {
    #[wasm_bindgen(constructor)]
    pub fn new(primitives: JsValue, config: Option<JsValue>) -> Result<LayoutDocument, JsValue> {
        let config = parse_config(config)?;
        let ctx = build_layout(primitives, &config)?;
        Ok(Self { ctx, config })
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> usize {
        self.ctx.page_count()
    }

    /// Rows of every page with run coordinates, for template authoring.
    #[wasm_bindgen(js_name = textDump)]
    pub fn text_dump(&self) -> String {
        self.ctx.text_dump()
    }

    #[wasm_bindgen(js_name = keywordsPresent)]
    pub fn keywords_present(&self, keywords: Vec<String>) -> bool {
        FieldFinder::new(&self.ctx).keywords_present(&keywords)
    }

    /// Index of the first template whose keywords all occur, if any.
    #[wasm_bindgen(js_name = selectTemplate)]
    pub fn select_template(&self, templates: JsValue) -> Result<Option<usize>, JsValue> {
        let templates: Vec<Template> = serde_wasm_bindgen::from_value(templates).map_err(js_error)?;
        Ok(select_template(&self.ctx, &templates)
            .and_then(|chosen| templates.iter().position(|t| std::ptr::eq(t, chosen))))
    }

    pub fn extract(&self, template: JsValue) -> Result<JsValue, JsValue> {
        let template = parse_template(template)?;
        let result = TemplateExtractor::new()
            .with_config(self.config.clone())
            .extract(&self.ctx, &template)
            .map_err(js_error)?;
        report(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn js(value: &serde_json::Value) -> JsValue {
        value.serialize(&serde_wasm_bindgen::Serializer::json_compatible()).unwrap()
    }

    fn primitives() -> JsValue {
        js(&json!({"pages": [[
            {"kind": "word", "bbox": [50, 740, 110, 750], "text": "Invoice:"},
            {"kind": "word", "bbox": [120, 740, 180, 750], "text": "A-17"}
        ]]}))
    }

    fn template(keyword: &str) -> serde_json::Value {
        json!({
            "name": keyword,
            "keywords": [keyword],
            "fields": [{"name": "number", "location": "right", "identifier": "Invoice:"}]
        })
    }

    #[wasm_bindgen_test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[wasm_bindgen_test]
    fn test_document_selects_and_extracts() {
        let doc = LayoutDocument::new(primitives(), None).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.keywords_present(vec!["A-17".to_string()]));

        let templates = js(&json!([template("Rechnung"), template("Invoice")]));
        assert_eq!(doc.select_template(templates).unwrap(), Some(1));

        let value = doc
            .extract(js(&template("Invoice")))
            .unwrap();
        let result: serde_json::Value = serde_wasm_bindgen::from_value(value).unwrap();
        assert_eq!(result["extraction"]["fields"]["number"], "A-17");
    }

    #[wasm_bindgen_test]
    fn test_invalid_template_is_rejected() {
        let bad = json!({"fields": [{"name": "n", "location": "right", "identifier": ""}]});
        let err = extract(primitives(), js(&bad), None);
        assert!(err.is_err());
    }
}

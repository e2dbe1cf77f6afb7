//! Subcommands and the input handling they share.

pub mod batch;
pub mod config;
pub mod extract;

use std::path::{Path, PathBuf};

use glob::glob;
use tracing::debug;

use invex_core::models::config::InvexConfig;
use invex_core::{LayoutContext, PdfExtractor, PrimitiveDocument, PrimitiveSource, Template};

/// Configuration from `path`, else the user config file, else the defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<InvexConfig> {
    let path = match path {
        Some(path) => PathBuf::from(path),
        None => {
            let user = config::default_config_path();
            if !user.exists() {
                return Ok(InvexConfig::default());
            }
            user
        }
    };
    debug!("Loading configuration from {}", path.display());
    Ok(InvexConfig::from_file(&path)?)
}

/// One template file, or every `*.json` template in a directory.
pub fn load_templates(path: &Path) -> anyhow::Result<Vec<Template>> {
    if !path.exists() {
        anyhow::bail!("Template path not found: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![Template::from_file(path)?]);
    }

    let pattern = path.join("*.json");
    let mut files: Vec<PathBuf> = glob(&pattern.to_string_lossy())?.filter_map(|r| r.ok()).collect();
    files.sort();

    let templates = files
        .iter()
        .map(|file| Template::from_file(file))
        .collect::<Result<Vec<_>, _>>()?;
    if templates.is_empty() {
        anyhow::bail!("No templates found in {}", path.display());
    }

    debug!("Loaded {} templates from {}", templates.len(), path.display());
    Ok(templates)
}

/// Whether `path` is a document the extractor can read.
pub fn is_supported(path: &Path) -> bool {
    matches!(extension(path).as_str(), "pdf" | "json")
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Build the layout index of a PDF or a primitives JSON file.
pub fn load_layout(path: &Path, config: &InvexConfig) -> anyhow::Result<LayoutContext> {
    let ctx = match extension(path).as_str() {
        "pdf" => PdfExtractor::open(path)?.layout(&config.layout)?,
        "json" => PrimitiveDocument::from_file(path)?.layout(&config.layout)?,
        other => anyhow::bail!("Unsupported file format: {}", other),
    };
    ctx.trace_structure();
    debug!("{} has {} pages", path.display(), ctx.page_count());
    Ok(ctx)
}

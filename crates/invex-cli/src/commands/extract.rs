//! Extract command - apply a template to a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invex_core::{select_template, ExtractionResult, LayoutExtractor, TemplateError, TemplateExtractor};

use super::{load_config, load_layout, load_templates};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF or primitives JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Template file or directory of templates
    #[arg(short, long)]
    template: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write the layout text dump to this file
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Print extraction warnings
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let templates = load_templates(&args.template)?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("Building layout index...");

    let ctx = load_layout(&args.input, &config)?;

    if let Some(dump_path) = &args.dump {
        let mut file = fs::File::create(dump_path)?;
        ctx.write_text_dump(&mut file)?;
        debug!("Wrote layout dump to {}", dump_path.display());
    }

    pb.set_message("Selecting template...");
    let Some(template) = select_template(&ctx, &templates) else {
        pb.finish_and_clear();
        return Err(TemplateError::NoMatch {
            document: args.input.display().to_string(),
        }
        .into());
    };

    pb.set_message("Extracting...");
    let result = TemplateExtractor::new().with_config(config).extract(&ctx, template)?;
    pb.finish_and_clear();

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    if args.show_warnings && !result.warnings.is_empty() {
        eprintln!("{}", style("Warnings:").yellow());
        for warning in &result.warnings {
            eprintln!("  - {}", warning);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&result.extraction)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let extraction = &result.extraction;
    let mut columns: Vec<&str> = Vec::new();
    for item in &extraction.lineitems {
        for column in item.columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(extraction.fields.keys().map(String::as_str).chain(columns.iter().copied()))?;

    if extraction.lineitems.is_empty() {
        wtr.write_record(extraction.fields.values())?;
    }
    for item in &extraction.lineitems {
        let cells = columns.iter().map(|column| item.get(column).unwrap_or(""));
        wtr.write_record(extraction.fields.values().map(String::as_str).chain(cells))?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(result: &ExtractionResult) -> String {
    let extraction = &result.extraction;
    let mut output = String::new();

    output.push_str(&format!("Template: {}\n", result.template));
    output.push('\n');

    output.push_str("Fields:\n");
    for (name, value) in &extraction.fields {
        output.push_str(&format!("  {}: {}\n", name, value.replace('\n', " / ")));
    }

    if !extraction.lineitems.is_empty() {
        output.push_str("\nLine items:\n");
        for (i, item) in extraction.lineitems.iter().enumerate() {
            let cells: Vec<String> = item
                .iter()
                .map(|(column, value)| format!("{}={}", column, value.replace('\n', " / ")))
                .collect();
            output.push_str(&format!("  {}. {}\n", i + 1, cells.join("; ")));
        }
    }

    if let Some(status) = &extraction.checkstatus {
        let verdict = match &status.match_status.description {
            None => "passed".to_string(),
            Some(description) => format!("failed ({})", description),
        };
        output.push_str(&format!("\nTotal check: {}\n", verdict));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use invex_core::{CheckStatus, Extraction, LineItem};

    fn result() -> ExtractionResult {
        let mut extraction = Extraction::default();
        extraction.fields.insert("number".to_string(), "A-17".to_string());
        extraction.lineitems.push([("qty", "2"), ("desc", "Bolt\nM8")].into_iter().collect::<LineItem>());
        extraction.lineitems.push([("qty", "1"), ("note", "spare")].into_iter().collect::<LineItem>());
        extraction.checkstatus = Some(CheckStatus::failed("3 != 2"));
        ExtractionResult {
            extraction,
            template: "hardware".to_string(),
            warnings: Vec::new(),
            processing_time_ms: 1,
        }
    }

    #[test]
    fn test_csv_has_one_row_per_line_item() {
        let csv = format_csv(&result()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "number,qty,desc,note");
        assert_eq!(lines[1], "A-17,2,\"Bolt");
        assert_eq!(csv.matches("A-17").count(), 2);
    }

    #[test]
    fn test_text_summary() {
        let text = format_text(&result());
        assert!(text.contains("Template: hardware"));
        assert!(text.contains("  1. qty=2; desc=Bolt / M8"));
        assert!(text.contains("Total check: failed (3 != 2)"));
    }
}

//! Batch command - apply templates to many documents in parallel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use invex_core::models::config::InvexConfig;
use invex_core::{select_template, ExtractionResult, LayoutExtractor, Template, TemplateError, TemplateExtractor};

use super::extract::{format_result, OutputFormat};
use super::{is_supported, load_config, load_layout, load_templates};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Template file or directory of templates
    #[arg(short, long)]
    template: PathBuf,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = Arc::new(load_config(config_path)?);
    let templates = Arc::new(load_templates(&args.template)?);

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let permits = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut tasks = JoinSet::new();
    for path in files {
        let permit = permits.clone().acquire_owned().await?;
        let config = config.clone();
        let templates = templates.clone();
        tasks.spawn_blocking(move || {
            let file_start = Instant::now();
            let outcome = process_single_file(&path, &templates, &config);
            drop(permit);
            (path, outcome, file_start.elapsed().as_millis() as u64)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (path, outcome, processing_time_ms) = joined?;
        overall_pb.inc(1);

        match outcome {
            Ok(result) => results.push(ProcessResult {
                path,
                result: Some(result),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    tasks.abort_all();
                    overall_pb.abandon();
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                results.push(ProcessResult {
                    path,
                    result: None,
                    error: Some(error_msg),
                    processing_time_ms,
                });
            }
        }
    }
    overall_pb.finish_with_message("Complete");
    results.sort_by(|a, b| a.path.cmp(&b.path));

    if let Some(output_dir) = &args.output_dir {
        for processed in &results {
            let Some(result) = &processed.result else {
                continue;
            };
            let output_name = processed.path.file_stem().and_then(|s| s.to_str()).unwrap_or("invoice");
            let output_path = output_dir.join(format!("{}.{}", output_name, args.format.extension()));
            fs::write(&output_path, format_result(result, args.format)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(path: &Path, templates: &[Template], config: &InvexConfig) -> anyhow::Result<ExtractionResult> {
    let ctx = load_layout(path, config)?;
    let Some(template) = select_template(&ctx, templates) else {
        return Err(TemplateError::NoMatch {
            document: path.display().to_string(),
        }
        .into());
    };
    Ok(TemplateExtractor::new().with_config(config.clone()).extract(&ctx, template)?)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "file",
        "template",
        "status",
        "fields",
        "lineitems",
        "check",
        "warnings",
        "processing_time_ms",
        "error",
    ])?;

    for processed in results {
        let file = processed.path.display().to_string();
        let time = processed.processing_time_ms.to_string();
        match &processed.result {
            Some(result) => {
                let check = match &result.extraction.checkstatus {
                    Some(status) if status.is_passed() => "passed",
                    Some(_) => "failed",
                    None => "",
                };
                let fields = result.extraction.fields.len().to_string();
                let lineitems = result.extraction.lineitems.len().to_string();
                let warnings = result.warnings.len().to_string();
                wtr.write_record([
                    file.as_str(),
                    result.template.as_str(),
                    "success",
                    fields.as_str(),
                    lineitems.as_str(),
                    check,
                    warnings.as_str(),
                    time.as_str(),
                    "",
                ])?;
            }
            None => {
                wtr.write_record([
                    file.as_str(),
                    "",
                    "error",
                    "",
                    "",
                    "",
                    "",
                    time.as_str(),
                    processed.error.as_deref().unwrap_or(""),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

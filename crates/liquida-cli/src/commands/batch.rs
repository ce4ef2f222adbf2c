//! Batch processing command for multiple payslip files.

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

use liquida_core::{AnchorPayslipParser, PayslipParser, SharedRecordStore};

use super::process::{format_records, load_config, read_documents, OutputFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory, one file per pay period
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue when a file cannot be read
    #[arg(long)]
    continue_on_error: bool,

    /// Treat each file as one payslip instead of one per page
    #[arg(long)]
    whole_document: bool,
}

/// Outcome of one document within a file.
struct DocumentResult {
    page: Option<u32>,
    period: Option<String>,
    valid: Option<bool>,
    error: Option<String>,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    documents: Vec<DocumentResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "pdf" | "txt" | "text")
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = Arc::new(AnchorPayslipParser::from_config(&config));
    let store = SharedRecordStore::new();
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let whole_document = args.whole_document;

    let mut tasks = JoinSet::new();
    for (index, path) in files.into_iter().enumerate() {
        let parser = Arc::clone(&parser);
        let store = store.clone();
        let permit = Arc::clone(&semaphore).acquire_owned().await?;

        tasks.spawn_blocking(move || {
            let result = process_single_file(&path, &parser, &store, whole_document);
            drop(permit);
            (index, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined?;

        if let Some(ref err) = result.error {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", result.path.display(), err);
            } else {
                error!("Failed to process {}: {}", result.path.display(), err);
                tasks.abort_all();
                overall_pb.abandon();
                anyhow::bail!("Processing failed for {}: {}", result.path.display(), err);
            }
        }

        results.push((index, result));
        overall_pb.inc(1);
    }
    overall_pb.finish_with_message("Complete");

    results.sort_by_key(|(index, _)| *index);
    let results: Vec<FileResult> = results.into_iter().map(|(_, r)| r).collect();

    let records = store.snapshot();
    let weekly_hours = config.report.weekly_hours;

    match &args.output_dir {
        Some(output_dir) => {
            for record in &records {
                let output_path = output_dir.join(format!("{}.{}", record.key(), args.format.extension()));
                let content = format_records(std::slice::from_ref(record), args.format, weekly_hours)?;
                fs::write(&output_path, content)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
        None if !records.is_empty() => {
            println!("{}", format_records(&records, args.format, weekly_hours)?);
        }
        None => {}
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed_files: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let skipped: Vec<(&FileResult, &DocumentResult)> = results
        .iter()
        .flat_map(|f| f.documents.iter().map(move |d| (f, d)))
        .filter(|(_, d)| d.error.is_some())
        .collect();
    let invalid = records.iter().filter(|r| !r.is_valid()).count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} periods, {} with mismatched totals, {} documents skipped, {} files failed",
        style(records.len()).green(),
        style(invalid).yellow(),
        style(skipped.len()).yellow(),
        style(failed_files.len()).red()
    );

    if !skipped.is_empty() {
        println!();
        println!("{}", style("Skipped documents:").yellow());
        for (file, document) in &skipped {
            println!(
                "  - {}{}: {}",
                file.path.display(),
                document.page.map(|p| format!(" page {}", p)).unwrap_or_default(),
                document.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if !failed_files.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed_files {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    parser: &AnchorPayslipParser,
    store: &SharedRecordStore,
    whole_document: bool,
) -> FileResult {
    let file_start = Instant::now();

    let documents = match read_documents(path, whole_document) {
        Ok(documents) => documents,
        Err(e) => {
            return FileResult {
                path: path.to_path_buf(),
                documents: Vec::new(),
                error: Some(e.to_string()),
                processing_time_ms: file_start.elapsed().as_millis() as u64,
            };
        }
    };

    let documents = documents
        .into_iter()
        .map(|document| match parser.parse(&document.text) {
            Ok(result) => {
                let record = result.record;
                let period = record.key();
                let valid = record.is_valid();
                store.upsert(record);
                DocumentResult {
                    page: document.page,
                    period: Some(period),
                    valid: Some(valid),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Skipping {} page {:?}: {}", path.display(), document.page, e);
                DocumentResult {
                    page: document.page,
                    period: None,
                    valid: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    FileResult {
        path: path.to_path_buf(),
        documents,
        error: None,
        processing_time_ms: file_start.elapsed().as_millis() as u64,
    }
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "page",
        "status",
        "period",
        "valid",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        let time = result.processing_time_ms.to_string();

        if let Some(err) = &result.error {
            wtr.write_record([filename, "", "failed", "", "", time.as_str(), err.as_str()])?;
            continue;
        }

        for document in &result.documents {
            let page = document.page.map(|p| p.to_string()).unwrap_or_default();
            let status = if document.error.is_some() { "skipped" } else { "success" };
            let valid = document.valid.map(|v| v.to_string()).unwrap_or_default();

            wtr.write_record([
                filename,
                page.as_str(),
                status,
                document.period.as_deref().unwrap_or(""),
                valid.as_str(),
                time.as_str(),
                document.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

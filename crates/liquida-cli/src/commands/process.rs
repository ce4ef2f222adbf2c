//! Process command - extract payslip records from a single file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use liquida_core::models::config::LiquidaConfig;
use liquida_core::models::payslip::{Category, PayslipRecord, SectionKind};
use liquida_core::payslip::rules::{format_clp_amount, split_pages};
use liquida_core::pdf::{PdfExtractor, PdfProcessor};
use liquida_core::{AnchorPayslipParser, RecordStore};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or plain text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Treat the whole file as one payslip instead of one per page
    #[arg(long)]
    whole_document: bool,

    /// Report section totals that do not match their items
    #[arg(long)]
    validate: bool,

    /// Show extraction warnings and timing
    #[arg(long)]
    show_warnings: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per record
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// One document read from an input file.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Page number, when the file was split into pages.
    pub page: Option<u32>,
    pub text: String,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")?
            .progress_chars("##-"),
    );

    pb.set_message("Reading text...");
    pb.set_position(10);
    let documents = read_documents(&args.input, args.whole_document)?;
    debug!("{} documents in {}", documents.len(), args.input.display());

    pb.set_message("Extracting payslips...");
    pb.set_position(40);

    let parser = AnchorPayslipParser::from_config(&config);
    let parse_start = Instant::now();
    let outcome = parser.process_batch(documents.iter().map(|d| d.text.as_str()));
    let parse_time_ms = parse_start.elapsed().as_millis();

    let mut store = RecordStore::new();
    for record in outcome.records {
        if let Some(replaced) = store.upsert(record) {
            warn!("Period {} appears more than once; keeping the later page", replaced.key());
        }
    }

    let failures: Vec<String> = outcome
        .failures
        .iter()
        .map(|failure| match documents.get(failure.index) {
            Some(document) => format!("{}: {}", describe(document), failure.error),
            None => failure.error.to_string(),
        })
        .collect();

    pb.finish_with_message("Done");

    if store.is_empty() {
        anyhow::bail!(
            "No payslip could be extracted from {}: {}",
            args.input.display(),
            failures.join("; ")
        );
    }

    let records: Vec<PayslipRecord> = store.into_records();

    if args.validate {
        report_findings(&records);
    }

    let output = format_records(&records, args.format, config.report.weekly_hours)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if !failures.is_empty() {
        eprintln!("{}", style("Skipped documents:").yellow());
        for failure in &failures {
            eprintln!("  - {}", failure);
        }
    }

    if args.show_warnings {
        for record in &records {
            for warning in &record.warnings {
                eprintln!("{} {}: {}", style("⚠").yellow(), record.key(), warning);
            }
        }
        eprintln!(
            "{} Extraction time: {}ms",
            style("ℹ").blue(),
            parse_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Load the configuration from an explicit path, the default location, or
/// built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<LiquidaConfig> {
    if let Some(path) = config_path {
        return Ok(LiquidaConfig::from_file(Path::new(path))?);
    }

    let default_path = super::config::default_config_path();
    if default_path.exists() {
        debug!("Using config at {}", default_path.display());
        Ok(LiquidaConfig::from_file(&default_path)?)
    } else {
        Ok(LiquidaConfig::default())
    }
}

/// Read the documents of a PDF or text file.
///
/// PDFs yield one document per page with text. Text files are split on form
/// feeds.
pub fn read_documents(path: &Path, whole_document: bool) -> anyhow::Result<Vec<SourceDocument>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let documents = match extension.as_str() {
        "pdf" => {
            let data = fs::read(path)?;
            let mut extractor = PdfExtractor::new();
            extractor.load(&data)?;

            if whole_document {
                vec![SourceDocument {
                    page: None,
                    text: extractor.extract_text()?,
                }]
            } else {
                let content = extractor.extract_all()?;
                for page in content.empty_pages() {
                    warn!("Page {} of {} has no text, skipping", page.number, path.display());
                }
                content
                    .pages
                    .into_iter()
                    .filter(|p| !p.text.trim().is_empty())
                    .map(|p| SourceDocument {
                        page: Some(p.number),
                        text: p.text,
                    })
                    .collect()
            }
        }
        "txt" | "text" => {
            let text = fs::read_to_string(path)?;
            if whole_document {
                vec![SourceDocument { page: None, text }]
            } else {
                split_pages(&text)
                    .into_iter()
                    .enumerate()
                    .map(|(i, page)| SourceDocument {
                        page: Some(i as u32 + 1),
                        text: page.to_string(),
                    })
                    .collect()
            }
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    };

    if documents.iter().all(|d| d.text.trim().is_empty()) {
        anyhow::bail!("No text could be extracted from {}", path.display());
    }

    Ok(documents)
}

fn describe(document: &SourceDocument) -> String {
    match document.page {
        Some(page) => format!("page {}", page),
        None => "document".to_string(),
    }
}

fn report_findings(records: &[PayslipRecord]) {
    for record in records {
        for finding in record.findings.iter().filter(|f| !f.within_tolerance) {
            eprintln!(
                "{} {} {}: items sum to {}, document states {}",
                style("✗").red(),
                record.period.label(),
                finding.section.display(),
                format_clp_amount(finding.summed_amount),
                format_clp_amount(finding.stated_amount)
            );
        }
    }

    let invalid = records.iter().filter(|r| !r.is_valid()).count();
    if invalid == 0 {
        eprintln!("{} All section totals match their items", style("✓").green());
    }
}

pub fn format_records(
    records: &[PayslipRecord],
    format: OutputFormat,
    weekly_hours: f64,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Csv => format_csv(records, weekly_hours),
        OutputFormat::Text => Ok(records
            .iter()
            .map(|r| format_text(r, weekly_hours))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn opt_amount(amount: Option<Decimal>) -> String {
    amount.map(|a| a.to_string()).unwrap_or_default()
}

fn format_csv(records: &[PayslipRecord], weekly_hours: f64) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![
        "period".to_string(),
        "gross".to_string(),
        "net".to_string(),
        "total_imponible".to_string(),
        "total_tributable".to_string(),
        "total_deductions".to_string(),
    ];
    header.extend(Category::ALL.iter().map(|c| c.display().to_string()));
    header.extend(["net_hourly_rate", "valid", "items", "warnings"].map(String::from));
    wtr.write_record(&header)?;

    for record in records {
        let totals = record.category_totals();

        let mut row = vec![
            record.key(),
            record.gross_amount.to_string(),
            opt_amount(record.net_amount),
            opt_amount(record.total_imponible),
            opt_amount(record.total_tributable),
            record.total_deductions().to_string(),
        ];
        row.extend(Category::ALL.iter().map(|c| totals[c].to_string()));
        row.push(opt_amount(record.net_hourly_rate(weekly_hours)));
        row.push(record.is_valid().to_string());
        row.push(record.items.len().to_string());
        row.push(record.warnings.len().to_string());
        wtr.write_record(&row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn format_text(record: &PayslipRecord, weekly_hours: f64) -> String {
    let mut output = String::new();

    output.push_str(&format!("Liquidación {} ({})\n", record.period.label(), record.key()));
    output.push_str(&format!("  Gross: {}\n", format_clp_amount(record.gross_amount)));
    if let Some(net) = record.net_amount {
        output.push_str(&format!("  Net:   {}\n", format_clp_amount(net)));
    }
    if let Some(rate) = record.net_hourly_rate(weekly_hours) {
        output.push_str(&format!("  Net per hour: {}\n", format_clp_amount(rate)));
    }

    for section in SectionKind::ALL {
        let items: Vec<_> = record.items_in(section).collect();
        if items.is_empty() && record.stated_total(section).is_none() {
            continue;
        }

        output.push('\n');
        output.push_str(&format!("{}:\n", capitalize(section.display())));
        for item in items {
            let flag = if item.rejection.is_some() { " (rejected)" } else { "" };
            output.push_str(&format!(
                "  {:<40} {:>14}{}\n",
                item.label,
                format_clp_amount(item.amount),
                flag
            ));
        }
        if let Some(total) = record.stated_total(section) {
            output.push_str(&format!("  {:<40} {:>14}\n", "Total", format_clp_amount(total)));
        }
    }

    let totals = record.category_totals();
    if totals.values().any(|v| !v.is_zero()) {
        output.push_str("\nDeductions by category:\n");
        for (category, amount) in &totals {
            output.push_str(&format!(
                "  {:<40} {:>14}\n",
                category.display(),
                format_clp_amount(*amount)
            ));
        }
    }

    let status = if record.is_valid() { "valid" } else { "MISMATCH" };
    output.push_str(&format!("\nValidation: {}\n", status));

    output
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

//! CLI binary for invoice2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`
//! and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use invoice2pdf::{
    generate_batch_to_file, generate_single_to_file, inspect, write_template, BatchConfig,
    BatchProgressCallback, DuplicatePolicy, InvoiceRecord, ProgressCallback, TEMPLATE_FILENAME,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-invoice
/// log lines using [indicatif].
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-invoice wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of invoices that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_batch_start` (called after ingestion, before any rendering).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading spreadsheet…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} invoices  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
        self.bar.reset_eta();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_invoices: usize) {
        self.activate_bar(total_invoices);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating {total_invoices} invoices…"))
        ));
    }

    fn on_invoice_start(&self, index: usize, _total: usize, invoice_no: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(format!("invoice {invoice_no}"));
    }

    fn on_invoice_complete(&self, index: usize, total: usize, invoice_no: &str, pdf_len: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Invoice {:>3}/{:<3}  {:<14}  {:<10}  {}",
            green("✓"),
            index + 1,
            total,
            invoice_no,
            dim(&format!("{:>6} KiB", pdf_len / 1024)),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_invoice_error(&self, index: usize, total: usize, invoice_no: &str, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = truncate_message(error, 80);

        self.bar.println(format!(
            "  {} Invoice {:>3}/{:<3}  {:<14}  {}  {}",
            red("✗"),
            index + 1,
            total,
            invoice_no,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, produced: usize) {
        let failed = total.saturating_sub(produced);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} invoices generated successfully",
                green("✔"),
                bold(&produced.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} invoices generated  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&produced.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

/// Truncate very long error messages to keep output tidy.
///
/// `max` is in bytes, but the cut lands on a char boundary so multi-byte
/// text (CJK invoice numbers, for one) never splits mid-character.
fn truncate_message(error: &str, max: usize) -> String {
    if error.len() <= max {
        return error.to_string();
    }
    let mut end = max - 1;
    while !error.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\u{2026}", &error[..end])
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate the batch archive next to the spreadsheet
  invoice2pdf invoices.xlsx

  # Custom output path and sharper rendering
  invoice2pdf invoices.xlsx -o january.zip --scale 3

  # Use a specific font and a logo
  invoice2pdf invoices.xlsx --font DejaVuSans.ttf --logo logo.png

  # Fail on filename collisions instead of suffixing
  invoice2pdf invoices.xlsx --on-duplicate reject

  # Show grouping and totals without rendering anything
  invoice2pdf --inspect-only invoices.xlsx

  # Write the empty batch template to fill in
  invoice2pdf --template-only

  # Render one invoice from a JSON record
  invoice2pdf --single record.json -o Invoice_20260101.pdf

  # Machine-readable run report
  invoice2pdf invoices.xlsx --json > report.json

SPREADSHEET FORMAT:
  One row per line item. Rows sharing an Invoice No become one invoice
  with one document; records keep the order their numbers first appear.

  Invoice No | Invoice Date | Billing Period | Currency | Item Date | Item Description | Item Amount
  ───────────┼──────────────┼────────────────┼──────────┼───────────┼──────────────────┼────────────
  20260101   | 01/01/2026   | December 2025  | USD      | Dec 2025  | Advertising      | 1000.00
  20260101   | 01/01/2026   | December 2025  | USD      | Dec 2025  | Consulting       | 500.00

  Headers are matched case- and spacing-insensitively. Currency defaults
  to USD; unparseable amounts count as 0 and the invoice still renders.

ENVIRONMENT VARIABLES:
  INVOICE2PDF_FONT     Path to a .ttf used when --font is not given
  RUST_LOG             Standard tracing filter (overrides -v/-q)

SETUP:
  1. Template:   invoice2pdf --template-only
  2. Fill it in with your billing rows
  3. Generate:   invoice2pdf invoice_batch_template.xlsx -o invoices.zip
"#;

/// Generate batches of invoice PDFs from an XLSX spreadsheet.
#[derive(Parser, Debug)]
#[command(
    name = "invoice2pdf",
    version,
    about = "Generate batches of invoice PDFs from an XLSX spreadsheet",
    long_about = "Read an XLSX workbook where every row is a billable line item, group rows \
sharing an invoice number into invoices, render each one onto an A4 page, and pack the \
single-page PDFs into one zip archive.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the batch spreadsheet (.xlsx). Not needed with --template-only or --single.
    input: Option<PathBuf>,

    /// Write the archive (or document/template) to this path.
    #[arg(short, long, env = "INVOICE2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Supersampling factor for rasterisation (1–4).
    #[arg(long, env = "INVOICE2PDF_SCALE", default_value_t = 2,
          value_parser = clap::value_parser!(u32).range(1..=4))]
    scale: u32,

    /// Per-invoice render timeout in seconds.
    #[arg(long, env = "INVOICE2PDF_SETTLE_TIMEOUT", default_value_t = 30)]
    settle_timeout: u64,

    /// Path to a TrueType font for the built-in renderer.
    #[arg(long, env = "INVOICE2PDF_FONT")]
    font: Option<PathBuf>,

    /// Logo image for the page header and watermark.
    #[arg(long, env = "INVOICE2PDF_LOGO")]
    logo: Option<PathBuf>,

    /// What to do when two invoices sanitise to the same filename.
    #[arg(long, env = "INVOICE2PDF_ON_DUPLICATE", value_enum, default_value = "suffix")]
    on_duplicate: DuplicateArg,

    /// Company name printed in the page header.
    #[arg(long, env = "INVOICE2PDF_COMPANY")]
    company: Option<String>,

    /// Output a structured JSON run report instead of human-readable text.
    #[arg(long, env = "INVOICE2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "INVOICE2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Print grouping and totals only, no rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Write the empty batch template and exit.
    #[arg(long)]
    template_only: bool,

    /// Render one invoice from a JSON record file instead of a batch.
    #[arg(long, conflicts_with = "input")]
    single: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INVOICE2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INVOICE2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum DuplicateArg {
    Suffix,
    Reject,
    Overwrite,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(v: DuplicateArg) -> Self {
        match v {
            DuplicateArg::Suffix => DuplicatePolicy::Suffix,
            DuplicateArg::Reject => DuplicatePolicy::Reject,
            DuplicateArg::Overwrite => DuplicatePolicy::Overwrite,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Template-only mode ───────────────────────────────────────────────
    if cli.template_only {
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(TEMPLATE_FILENAME));
        write_template(&path).context("Failed to write template")?;
        if !cli.quiet {
            eprintln!("{} Template written to {}", green("✔"), bold(&path.display().to_string()));
        }
        return Ok(());
    }

    // ── Single-invoice mode ──────────────────────────────────────────────
    if let Some(ref record_path) = cli.single {
        let json = tokio::fs::read_to_string(record_path)
            .await
            .with_context(|| format!("Failed to read record from {record_path:?}"))?;
        let record: InvoiceRecord =
            serde_json::from_str(&json).context("Record file is not a valid invoice record")?;

        let config = build_config(&cli, None)?;
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("Invoice_{}.pdf", record.invoice_no)));
        let len = generate_single_to_file(&record, &output, &config)
            .await
            .context("Invoice generation failed")?;

        if !cli.quiet {
            eprintln!(
                "{} {}  {}",
                green("✔"),
                bold(&output.display().to_string()),
                dim(&format!("{} KiB", len / 1024)),
            );
        }
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("Missing spreadsheet path (or use --template-only / --single)")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let bytes = tokio::fs::read(&input)
            .await
            .with_context(|| format!("Failed to read {input:?}"))?;
        let summary = inspect(&bytes).context("Failed to inspect spreadsheet")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else {
            println!("File:       {}", input.display());
            println!("Invoices:   {}", summary.invoice_count);
            println!("Line items: {}", summary.line_item_count);
            println!();
            for inv in &summary.invoices {
                println!(
                    "  {:<16} {:>3} items  {:>14} {}",
                    inv.invoice_no, inv.item_count, inv.total, inv.currency
                );
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    // The progress bar starts as a spinner; `on_batch_start` resizes it to
    // the invoice count once ingestion has grouped the rows.
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(invoice2pdf::BATCH_ARCHIVE_NAME));

    // ── Run batch ────────────────────────────────────────────────────────
    let output = generate_batch_to_file(&input, &output_path, &config)
        .await
        .context("Batch generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        // Summary line (the callback already printed the per-invoice log).
        eprintln!(
            "{}  {}/{} invoices  {}ms  →  {}",
            if output.stats.failed_invoices == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            output.stats.produced_invoices,
            output.stats.total_invoices,
            output.stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if output.stats.failed_invoices > 0 {
            for inv in output.invoices.iter().filter(|i| i.error.is_some()) {
                if let Some(ref err) = inv.error {
                    eprintln!("   {} {}", red("✗"), err);
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .scale(cli.scale)
        .settle_timeout_secs(cli.settle_timeout)
        .duplicate_policy(cli.on_duplicate.clone().into());

    if let Some(ref font) = cli.font {
        builder = builder.font_path(font);
    }
    if let Some(ref logo) = cli.logo {
        builder = builder.logo_path(logo);
    }
    if let Some(ref company) = cli.company {
        let mut brand = invoice2pdf::BrandProfile::default();
        brand.company_name = company.clone();
        builder = builder.brand(brand);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::truncate_message;

    #[test]
    fn short_messages_pass_through() {
        assert_eq!(truncate_message("render failed", 80), "render failed");
    }

    #[test]
    fn long_ascii_messages_are_truncated_with_ellipsis() {
        let long = "x".repeat(200);
        let msg = truncate_message(&long, 80);
        assert_eq!(msg.chars().count(), 80);
        assert!(msg.ends_with('\u{2026}'));
    }

    #[test]
    fn truncation_never_splits_a_multibyte_character() {
        // A CJK invoice number pushes the cut point into multi-byte text.
        let error = format!("Invoice '发票二零二六零一零一号' render failed: {}", "详".repeat(40));
        assert!(error.len() > 80);
        let msg = truncate_message(&error, 80);
        assert!(msg.len() <= 80);
        assert!(msg.ends_with('\u{2026}'));
        assert!(msg.is_char_boundary(msg.len() - '\u{2026}'.len_utf8()));
    }
}

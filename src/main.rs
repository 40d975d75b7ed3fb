//! CLI entry point for the RAN KPI report tool.
//!
//! Loads 4G and 5G counter exports, computes per-group KPIs and renders
//! them into a PDF report, or exports the normalised dataset as CSV.

use anyhow::Result;
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use ran_kpi_report::{
    dataset::{self, DatasetOptions},
    output::write_samples,
    report::{ReportGenerator, pdf::write_pdf, write_svgs},
    samples::parse_datetime_str,
    tech::TechConfigSet,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ran_kpi_report")]
#[command(about = "Build 4G/5G KPI reports from counter exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Folder holding the 4G .xlsx exports
    #[arg(long = "input-4g", value_name = "DIR", default_value = "4G")]
    input_4g: PathBuf,

    /// Folder holding the 5G .xlsx exports
    #[arg(long = "input-5g", value_name = "DIR", default_value = "5G")]
    input_5g: PathBuf,

    /// JSON file overriding the per-technology column layout
    #[arg(long, value_name = "FILE")]
    tech_config: Option<PathBuf>,

    /// Only keep samples at or after this time (e.g. "2025-03-22 12:00")
    #[arg(long, value_parser = parse_bound)]
    from: Option<NaiveDateTime>,

    /// Only keep samples at or before this time
    #[arg(long, value_parser = parse_bound)]
    to: Option<NaiveDateTime>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the PDF report
    Report {
        #[command(flatten)]
        input: InputArgs,

        /// PDF file to write
        #[arg(short, long, default_value = "report.pdf")]
        output: PathBuf,

        /// Restrict the report to these groups (repeatable)
        #[arg(short, long = "group", value_name = "NAME")]
        groups: Vec<String>,

        /// Optional: also write every chart as SVG into this folder
        #[arg(long, value_name = "DIR")]
        svg_dir: Option<PathBuf>,
    },
    /// Export the combined, normalised samples as CSV
    Export {
        #[command(flatten)]
        input: InputArgs,

        /// CSV file to write
        #[arg(short, long, default_value = "samples.csv")]
        output: PathBuf,

        /// Gzip compress the CSV (".gz" is appended)
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

fn parse_bound(value: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_datetime_str(value).ok_or_else(|| format!("unrecognised date/time '{value}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ran_kpi_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ran_kpi_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            input,
            output,
            groups,
            svg_dir,
        } => {
            let samples = dataset::load(&dataset_options(input)?).await?;
            let groups = (!groups.is_empty()).then_some(groups);

            let pages = tokio::task::spawn_blocking(move || {
                let generator = ReportGenerator::new(samples, groups);
                info!(
                    groups = generator.groups().len(),
                    samples = generator.samples().len(),
                    "Rendering report"
                );
                generator.pages()
            })
            .await??;

            if let Some(dir) = svg_dir {
                write_svgs(&dir, &pages)?;
            }

            let title = output
                .file_stem()
                .and_then(OsStr::to_str)
                .unwrap_or("report")
                .to_string();
            write_pdf(&output, &title, &pages)?;
            info!(output = %output.display(), pages = pages.len(), "Report finished");
        }
        Commands::Export {
            input,
            output,
            gzip,
        } => {
            let samples = dataset::load(&dataset_options(input)?).await?;
            if samples.is_empty() {
                warn!("no samples loaded, export will be empty");
            }
            let written = write_samples(&output, &samples, gzip)?;
            info!(output = %written.display(), rows = samples.len(), "Export finished");
        }
    }

    Ok(())
}

fn dataset_options(input: InputArgs) -> Result<DatasetOptions> {
    let configs = match &input.tech_config {
        Some(path) => TechConfigSet::load(path)?,
        None => TechConfigSet::default(),
    };
    DatasetOptions::new(input.input_4g, input.input_5g, configs, input.from, input.to)
}

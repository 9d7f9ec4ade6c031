use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wisdom::{AnalysisConfig, DiagnosticSink, WisdomError, WisdomItem, WisdomReport};

#[derive(Parser)]
#[command(name = "wisdom-rs")]
#[command(about = "Blank, deskew, line-count and drawing analysis for scanned notes", long_about = None)]
struct Cli {
    /// Input image paths
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON file overriding analysis parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for diagnostic images
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    /// One JSON object per image
    Json,
    /// Human readable summary per image
    Text,
    /// TSV format: filename\tblank\tangle\tlines\tdrawing
    Tsv,
}

fn analyse(path: &Path, config: &AnalysisConfig, diagnostics: Option<&Path>) -> Result<WisdomReport, WisdomError> {
    let mut item = WisdomItem::open_with(path, config.clone())?;
    if let Some(dir) = diagnostics {
        item = item.with_diagnostics(DiagnosticSink::new(dir));
    }
    item.report()
}

fn print_report(report: &WisdomReport, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::Text => {
            if report.is_blank {
                println!("{}: blank", report.filename);
            } else {
                println!(
                    "{}: angle {}°, {} line(s), {}",
                    report.filename,
                    report.best_angle_degrees,
                    report.line_count,
                    if report.is_drawing { "drawing" } else { "text" }
                );
            }
        }
        OutputFormat::Tsv => println!(
            "{}\t{}\t{}\t{}\t{}",
            report.filename,
            report.is_blank,
            report.best_angle_degrees,
            report.line_count,
            report.is_drawing
        ),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AnalysisConfig::from_json_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => AnalysisConfig::default(),
    };

    let mut failed = 0usize;
    for path in &cli.images {
        let printed = analyse(path, &config, cli.diagnostics.as_deref())
            .and_then(|report| print_report(&report, cli.format).map_err(WisdomError::from));
        if let Err(err) = printed {
            eprintln!("error: {}: {err}", path.display());
            failed += 1;
        }
    }

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unmark_pdf::{process_path, BatchSummary, DocumentCleaner};

#[derive(Parser)]
#[command(
    name = "unmarkpdf",
    about = "Removes watermark stamps from PDF files",
    version,
    author
)]
struct Cli {
    /// PDF files or directories to clean (quoted paths accepted)
    paths: Vec<String>,
}

fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries the per-file outcome lines.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unmark_pdf=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    if cli.paths.is_empty() {
        print_usage_and_wait()?;
        return Ok(());
    }
    debug!(paths = cli.paths.len(), "parsed arguments");

    let cleaner = DocumentCleaner::new();
    let mut summary = BatchSummary::new();
    for raw in &cli.paths {
        let path = Path::new(raw.trim_matches('"'));
        if path.is_dir() {
            println!("Processing folder: {}", path.display());
        }
        for outcome in process_path(&cleaner, path) {
            println!("{outcome}");
            summary.record(&outcome);
        }
    }

    println!();
    println!("{summary}");
    Ok(())
}

/// Drag-and-drop convenience: launched with no arguments (double-clicked),
/// show usage and keep the window open until Enter.
fn print_usage_and_wait() -> Result<()> {
    println!("Usage: Drag & Drop PDF files onto unmarkpdf.");
    println!("Or: unmarkpdf <path_to_pdf>");
    print!("Press Enter to exit...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

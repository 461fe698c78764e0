//! `pdfqa`: ask questions about a PDF and get answers grounded in its pages.
//!
//! ```bash
//! pdfqa index report.pdf
//! pdfqa ask <PDF_ID> "Who approved the budget?"
//! pdfqa chat <PDF_ID>
//! pdfqa --offline index report.pdf      # no API key needed
//! ```

use clap::Parser;
use pdfqa_cli::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` can supply the PDFQA_* flag defaults.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    pdfqa_cli::run(Cli::parse()).await
}

//! openapi-crawler CLI
//!
//! Crawls the GET endpoints of an API described by a Swagger/OpenAPI
//! document and prints the inferred datasets as JSON.
//!
//! Logs go to stderr so stdout only carries the result document. Ctrl-C
//! stops scheduling new endpoints; the partial result is still written.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crawler_core::{CrawlConfig, CrawlOutcome, CrawlWarning, DatasetRecord};

/// openapi-crawler - infer dataset schemas from an API's GET endpoints
#[derive(Parser, Debug)]
#[command(name = "openapi-crawler")]
#[command(author = "Symbia Labs")]
#[command(version = "0.1.0")]
#[command(about = "Discover GET endpoints of an OpenAPI/Swagger API and infer their schemas")]
struct Args {
    /// Crawl recipe (YAML, or JSON with a .json extension)
    #[arg(short, long, env = "OPENAPI_CRAWLER_CONFIG")]
    config: PathBuf,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fetches in flight among independent endpoints (overrides the recipe)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Bearer token (overrides the recipe's credentials)
    #[arg(long, env = "OPENAPI_CRAWLER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Document written at the end of a crawl
#[derive(Serialize)]
struct CrawlDocument<'a> {
    records: Vec<&'a DatasetRecord>,
    warnings: &'a [CrawlWarning],
    cancelled: bool,
}

impl<'a> From<&'a CrawlOutcome> for CrawlDocument<'a> {
    fn from(outcome: &'a CrawlOutcome) -> Self {
        Self {
            records: outcome.records().collect(),
            warnings: outcome.report.warnings(),
            cancelled: outcome.cancelled,
        }
    }
}

fn load_config(args: &Args) -> Result<CrawlConfig, Box<dyn std::error::Error>> {
    let mut config = CrawlConfig::load(&args.config)
        .map_err(|e| format!("Failed to load {}: {}", args.config.display(), e))?;

    if let Some(concurrency) = args.concurrency {
        config.max_concurrent_fetches = concurrency;
    }
    if let Some(token) = &args.token {
        config.token = Some(token.clone());
    }

    Ok(config)
}

fn write_document(
    document: &CrawlDocument<'_>,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, document)?;
            writer.flush()?;
            info!("Wrote result to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, document)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    info!("Crawling {} ({})", config.name, config.url);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for in-flight requests");
            on_interrupt.cancel();
        }
    });

    let outcome = crawler_core::run(config, cancel).await?;

    write_document(&CrawlDocument::from(&outcome), args.output.as_ref())?;

    if outcome.cancelled {
        warn!("Crawl was cancelled; the result is partial");
    }
    Ok(())
}

// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (stderr, filtered by RUST_LOG or -v)
// 3. Build the page source and wrap it in the shared cache
// 4. Start the crawl and a consumer that prints events as they arrive
// 5. Wait for every crawl task to finish, then print a summary
// 6. Exit with proper code (0 = all fetched, 1 = some fetches failed, 2 = error)
// =============================================================================

mod cli;
mod crawl;
mod fetch;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use crawl::CrawlOptions;
use fetch::{CachingFetcher, FakeFetcher};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// Returns:
//   Ok(0) = every page was fetched
//   Ok(1) = at least one fetch failed
//   Err   = could not start the crawl (bad graph file, ...)
async fn run(cli: Cli) -> Result<i32> {
    let source = match &cli.graph {
        Some(path) => FakeFetcher::from_json_file(path)
            .with_context(|| format!("could not load page graph from {}", path.display()))?,
        None => FakeFetcher::golang_fixture(),
    };
    let source = Arc::new(source.with_latency(Duration::from_millis(cli.latency_ms)));
    let cache = Arc::new(CachingFetcher::new(Arc::clone(&source), cli.cache));

    info!(
        start = %cli.start_url,
        depth = cli.depth,
        pages = source.len(),
        policy = ?cli.cache,
        "starting crawl"
    );

    let options = CrawlOptions {
        max_concurrency: cli.max_concurrency,
    };
    let session = crawl::crawl(&cli.start_url, cli.depth, cache.clone(), &options);
    let (events, tracker) = session.into_parts();

    let printer = tokio::spawn(report::drain_events(events, cli.json, std::io::stdout()));

    tracker.wait().await;
    let summary = printer.await.context("output consumer panicked")??;

    info!(found = summary.found, failed = summary.failed, "crawl finished");
    report::print_summary(&summary, &cache.stats(), source.total_calls());

    Ok(if summary.failed > 0 { 1 } else { 0 })
}

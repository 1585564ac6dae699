// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There is a single command: crawl from a start URL down to a given depth,
// against either the built-in page graph or one loaded from a JSON file.
// =============================================================================

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::fetch::CachePolicy;

#[derive(Parser, Debug)]
#[command(
    name = "link-crawler",
    version,
    about = "Crawl a page graph in parallel down to a fixed depth",
    long_about = "link-crawler starts at a URL, fetches it, and crawls every link it finds in parallel \
                  until the depth runs out. Pages are fetched through a shared cache so each one is \
                  retrieved at most once."
)]
pub struct Cli {
    /// URL to start crawling from
    #[arg(default_value = "https://golang.org/")]
    pub start_url: String,

    /// Maximum crawl depth
    ///
    /// Depth 0 = fetch nothing
    /// Depth 1 = just the starting page
    /// Depth 2 = starting page + all pages it links to
    #[arg(short, long, default_value_t = 4)]
    pub depth: usize,

    /// JSON file describing the page graph to crawl
    ///
    /// Shape: { "<url>": { "body": "...", "links": ["<url>", ...] } }
    /// Without it the built-in golang.org graph is used.
    #[arg(long, value_name = "FILE")]
    pub graph: Option<PathBuf>,

    /// How concurrent requests for the same uncached URL are handled
    #[arg(long, value_enum, default_value_t = CachePolicy::SingleFlight)]
    pub cache: CachePolicy,

    /// Maximum number of fetches in flight at once (unbounded if omitted)
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Simulated delay for every fetch, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 0)]
    pub latency_ms: u64,

    /// Print each event as a line of JSON instead of plain text
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["link-crawler"]).unwrap();
        assert_eq!(cli.start_url, "https://golang.org/");
        assert_eq!(cli.depth, 4);
        assert_eq!(cli.cache, CachePolicy::SingleFlight);
        assert_eq!(cli.max_concurrency, None);
        assert!(!cli.json);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "link-crawler",
            "A",
            "--depth",
            "2",
            "--graph",
            "graph.json",
            "--cache",
            "best-effort",
            "--max-concurrency",
            "8",
            "--latency-ms",
            "25",
            "--json",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.start_url, "A");
        assert_eq!(cli.depth, 2);
        assert_eq!(cli.graph, Some(PathBuf::from("graph.json")));
        assert_eq!(cli.cache, CachePolicy::BestEffort);
        assert_eq!(cli.max_concurrency, Some(8));
        assert_eq!(cli.latency_ms, 25);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }
}

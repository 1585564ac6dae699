// src/report.rs
// =============================================================================
// The consumer side of a crawl: prints events as they arrive and the summary
// at the end.
//
// Events go to stdout (plain text or JSON lines). The summary goes to stderr
// so `--json` output stays machine-readable.
// =============================================================================

use anyhow::Result;
use std::io::Write;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::crawl::CrawlEvent;
use crate::fetch::CacheStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub found: usize,
    pub failed: usize,
}

impl CrawlSummary {
    fn record(&mut self, event: &CrawlEvent) {
        if event.is_failure() {
            self.failed += 1;
        } else {
            self.found += 1;
        }
    }
}

/// Drains `events` until the crawl closes the channel, writing each one to `out`.
pub async fn drain_events<W: Write>(
    mut events: UnboundedReceiver<CrawlEvent>,
    json: bool,
    mut out: W,
) -> Result<CrawlSummary> {
    let mut summary = CrawlSummary::default();

    while let Some(event) = events.recv().await {
        summary.record(&event);
        if json {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        } else {
            writeln!(out, "{}", event)?;
        }
    }

    out.flush()?;
    Ok(summary)
}

pub fn print_summary(summary: &CrawlSummary, cache: &CacheStats, upstream_calls: usize) {
    eprintln!();
    eprintln!("📊 Summary:");
    eprintln!("   ✅ Found: {}", summary.found);
    eprintln!("   ❌ Failed: {}", summary.failed);
    eprintln!(
        "   🗄️  Cache: {} hit(s), {} joined, {} miss(es), {} entr{}",
        cache.hits,
        cache.joined,
        cache.misses,
        cache.entries,
        if cache.entries == 1 { "y" } else { "ies" }
    );
    eprintln!("   🌐 Upstream fetches: {}", upstream_calls);
}

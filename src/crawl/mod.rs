// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - One tokio task per (URL, remaining depth), spawned as links are found
// - Depth-bounded: a task with zero depth left does nothing
// - Results stream out through a channel as they happen
// - A completion tracker says when every task is done
// - Optional cap on how many fetches run at once
//
// Submodules:
// - crawler: Spawning, fetching and emitting events
// - tracker: Counting outstanding tasks
// =============================================================================

mod crawler;
mod tracker;

pub use crawler::{crawl, CrawlEvent, CrawlOptions};

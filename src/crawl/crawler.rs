// src/crawl/crawler.rs
// =============================================================================
// The recursive, parallel part of the crawl.
//
// How it works:
// 1. spawn() registers a task with the CompletionTracker, then tokio::spawn()s it
// 2. The task fetches its URL (unless its remaining depth is zero)
// 3. It sends one CrawlEvent (found or failed) down the channel
// 4. On success it spawn()s one child per link, at depth - 1, and returns
//
// Parents never wait for their children. The tracker is the only thing that
// knows when the whole tree is done, and the channel closes once the last task
// (and with it the last sender) is gone.
//
// Rust concepts:
// - tokio::spawn: Runs a future as an independent task on the runtime
// - mpsc channels: Many producers, one consumer
// - BoxFuture: A heap-allocated future, needed because crawl() spawns itself
// =============================================================================

use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use super::tracker::{CompletionTracker, TaskGuard};
use crate::fetch::{FetchError, Fetcher, Page};

/// One retrieval attempt, as seen by whoever drains the crawl output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrawlEvent {
    Found {
        url: String,
        depth: usize,
        body: String,
    },
    Failed {
        url: String,
        depth: usize,
        error: String,
    },
}

impl CrawlEvent {
    pub fn url(&self) -> &str {
        match self {
            CrawlEvent::Found { url, .. } | CrawlEvent::Failed { url, .. } => url,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CrawlEvent::Failed { .. })
    }
}

impl fmt::Display for CrawlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlEvent::Found { url, body, .. } => write!(f, "found: {} {:?}", url, body),
            CrawlEvent::Failed { error, .. } => f.write_str(error),
        }
    }
}

/// Knobs for a single crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Upper bound on fetches running at the same time. `None` = unbounded.
    pub max_concurrency: Option<usize>,
}

#[derive(Clone)]
struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    sink: UnboundedSender<CrawlEvent>,
    tracker: CompletionTracker,
    limit: Option<Arc<Semaphore>>,
}

impl Crawler {
    fn spawn(&self, url: String, depth: usize) {
        // Registered here, in the parent, before the child exists.
        let guard = self.tracker.register();
        tokio::spawn(self.clone().crawl(url, depth, guard));
    }

    fn crawl(self, url: String, depth: usize, guard: TaskGuard) -> BoxFuture<'static, ()> {
        async move {
            let _guard = guard;

            if depth == 0 {
                trace!(%url, "depth exhausted");
                return;
            }

            let page = match self.fetch(&url).await {
                Ok(page) => page,
                Err(error) => {
                    self.emit(CrawlEvent::Failed {
                        url,
                        depth,
                        error: error.to_string(),
                    });
                    return;
                }
            };

            let Page { body, links } = page;
            self.emit(CrawlEvent::Found {
                url: url.clone(),
                depth,
                body,
            });

            debug!(%url, children = links.len(), depth = depth - 1, "spawning children");
            for link in links {
                self.spawn(link, depth - 1);
            }
        }
        .boxed()
    }

    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let _permit = match &self.limit {
            // The semaphore is never closed, so acquire() only fails in theory.
            Some(limit) => limit.acquire().await.ok(),
            None => None,
        };
        self.fetcher.fetch(url).await
    }

    fn emit(&self, event: CrawlEvent) {
        if let Err(err) = self.sink.send(event) {
            warn!(url = err.0.url(), "crawl output closed, dropping event");
        }
    }
}

/// A running crawl: its event stream plus the tracker that says when it's done.
pub struct CrawlSession {
    events: UnboundedReceiver<CrawlEvent>,
    tracker: CompletionTracker,
}

impl CrawlSession {
    pub fn into_parts(self) -> (UnboundedReceiver<CrawlEvent>, CompletionTracker) {
        (self.events, self.tracker)
    }

    /// Drains every event, returning once all tasks have finished.
    pub async fn collect(self) -> Vec<CrawlEvent> {
        let (mut events, tracker) = self.into_parts();
        let mut collected = Vec::new();
        while let Some(event) = events.recv().await {
            collected.push(event);
        }
        tracker.wait().await;
        collected
    }
}

/// Starts crawling `start_url` down to `depth` levels.
///
/// Must be called from inside a tokio runtime; the root task is spawned
/// before this returns.
pub fn crawl(
    start_url: &str,
    depth: usize,
    fetcher: Arc<dyn Fetcher>,
    options: &CrawlOptions,
) -> CrawlSession {
    let (sink, events) = mpsc::unbounded_channel();
    let tracker = CompletionTracker::new();

    let crawler = Crawler {
        fetcher,
        sink,
        tracker: tracker.clone(),
        limit: options
            .max_concurrency
            .map(|permits| Arc::new(Semaphore::new(permits.max(1)))),
    };
    crawler.spawn(start_url.to_string(), depth);

    CrawlSession { events, tracker }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why does crawl() return BoxFuture instead of being an `async fn`?
//    - crawl() indirectly spawns more crawl() futures
//    - An async fn's future type would have to contain itself
//    - Boxing gives the future a fixed, known type
//
// 2. How does the consumer know the channel is finished?
//    - Every task owns a clone of the sender (inside its Crawler)
//    - When the last task finishes, the last sender is dropped
//    - recv() then returns None
//
// 3. What is `let _guard = guard;`?
//    - It keeps the guard alive until the end of the block
//    - Every return path drops it, which is what marks the task done
// -----------------------------------------------------------------------------

// src/fetch/cache.rs
// =============================================================================
// A fetcher that remembers every page it has successfully retrieved.
//
// CachingFetcher wraps any other Fetcher and implements Fetcher itself, so it
// can be dropped in anywhere a fetcher is expected. All crawl tasks share one
// instance, and one Mutex guards the whole map.
//
// Two policies:
// - BestEffort: lock, look up, unlock, fetch, lock, insert, unlock.
//   Two tasks that miss on the same URL at the same time both fetch it.
// - SingleFlight: the first task to miss stores a shared in-flight future
//   under the lock. Anyone else asking for that URL awaits the same future,
//   so a successful URL reaches the inner fetcher exactly once.
//
// Failures are never cached. A failed URL is fetched again on the next call.
//
// Rust concepts:
// - Mutex<HashMap>: Shared mutable state across threads
// - Atomics: Lock-free counters for statistics
// - futures::future::Shared: A future many tasks can await together
// =============================================================================

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::{FetchError, Fetcher, Page};

/// How concurrent misses on the same URL are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CachePolicy {
    /// Concurrent misses may each call the inner fetcher; last insert wins.
    BestEffort,
    /// Concurrent misses share one call to the inner fetcher.
    #[default]
    SingleFlight,
}

/// Counters describing how the cache has been used so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Served from a completed entry.
    pub hits: u64,
    /// Joined a fetch another task already had in flight.
    pub joined: u64,
    /// Forwarded to the inner fetcher.
    pub misses: u64,
    /// Pages currently stored.
    pub entries: usize,
}

type Flight = Shared<BoxFuture<'static, Result<Page, FetchError>>>;

enum Slot {
    Ready(Page),
    Pending(Flight),
}

pub struct CachingFetcher<F: ?Sized> {
    inner: Arc<F>,
    policy: CachePolicy,
    entries: Mutex<HashMap<String, Slot>>,
    hits: AtomicU64,
    joined: AtomicU64,
    misses: AtomicU64,
}

impl<F: Fetcher + ?Sized + 'static> CachingFetcher<F> {
    pub fn new(inner: Arc<F>, policy: CachePolicy) -> Self {
        Self {
            inner,
            policy,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .entries()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count();

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        // A panic while holding the lock can't leave the map half-written:
        // every critical section is a single get/insert/remove.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_hit(&self, url: &str, page: &Page) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        debug!(url, body = %page.body, "hit from cache");
    }

    async fn fetch_best_effort(&self, url: &str) -> Result<Page, FetchError> {
        let cached = match self.entries().get(url) {
            Some(Slot::Ready(page)) => Some(page.clone()),
            _ => None,
        };
        if let Some(page) = cached {
            self.record_hit(url, &page);
            return Ok(page);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(url, "cache miss");
        let page = self.inner.fetch(url).await?;

        self.entries()
            .insert(url.to_string(), Slot::Ready(page.clone()));
        Ok(page)
    }

    async fn fetch_single_flight(&self, url: &str) -> Result<Page, FetchError> {
        let flight = {
            let mut entries = self.entries();
            match entries.get(url) {
                Some(Slot::Ready(page)) => {
                    self.record_hit(url, page);
                    return Ok(page.clone());
                }
                Some(Slot::Pending(flight)) => {
                    self.joined.fetch_add(1, Ordering::Relaxed);
                    debug!(url, "joining in-flight fetch");
                    flight.clone()
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!(url, "cache miss");
                    let inner = Arc::clone(&self.inner);
                    let owned = url.to_string();
                    let flight = async move { inner.fetch(&owned).await }
                        .boxed()
                        .shared();
                    entries.insert(url.to_string(), Slot::Pending(flight.clone()));
                    flight
                }
            }
        };

        let result = flight.clone().await;
        self.settle(url, &flight, &result);
        result
    }

    // Every waiter calls this once its flight resolves; only the first one
    // still finds its own flight in the slot.
    fn settle(&self, url: &str, flight: &Flight, result: &Result<Page, FetchError>) {
        let mut entries = self.entries();
        let ours = matches!(entries.get(url), Some(Slot::Pending(current)) if current.ptr_eq(flight));
        if !ours {
            return;
        }

        match result {
            Ok(page) => {
                entries.insert(url.to_string(), Slot::Ready(page.clone()));
            }
            Err(_) => {
                entries.remove(url);
            }
        }
    }
}

#[async_trait]
impl<F: Fetcher + ?Sized + 'static> Fetcher for CachingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        match self.policy {
            CachePolicy::BestEffort => self.fetch_best_effort(url).await,
            CachePolicy::SingleFlight => self.fetch_single_flight(url).await,
        }
    }
}

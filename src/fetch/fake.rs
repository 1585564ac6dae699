// src/fetch/fake.rs
// =============================================================================
// A fetcher that serves pages from an in-memory table instead of the network.
//
// The table comes either from the built-in golang.org fixture or from a JSON
// file shaped like:
//
//   {
//     "https://example.com/": { "body": "Home", "links": ["https://example.com/a"] },
//     "https://example.com/a": { "body": "A" }
//   }
//
// Every call is counted per URL, so callers can see how often the
// underlying source was actually hit.
// =============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use super::{FetchError, Fetcher, Page};

/// Errors from loading a page graph file.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("failed to read graph file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid graph JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Page>,
    latency: Duration,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeFetcher {
    pub fn from_pages<I, K>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, Page)>,
        K: Into<String>,
    {
        Self {
            pages: pages.into_iter().map(|(url, page)| (url.into(), page)).collect(),
            ..Self::default()
        }
    }

    /// The four golang.org pages used as the default demo graph.
    ///
    /// `https://golang.org/cmd/` is linked to but missing, so a crawl of
    /// this graph always reports at least one failure.
    pub fn golang_fixture() -> Self {
        let page = |body: &str, links: &[&str]| {
            Page::new(body, links.iter().map(|l| l.to_string()).collect())
        };

        Self::from_pages([
            (
                "https://golang.org/",
                page(
                    "The Go Programming Language",
                    &["https://golang.org/pkg/", "https://golang.org/cmd/"],
                ),
            ),
            (
                "https://golang.org/pkg/",
                page(
                    "Packages",
                    &[
                        "https://golang.org/",
                        "https://golang.org/cmd/",
                        "https://golang.org/pkg/fmt/",
                        "https://golang.org/pkg/os/",
                    ],
                ),
            ),
            (
                "https://golang.org/pkg/fmt/",
                page(
                    "Package fmt",
                    &["https://golang.org/", "https://golang.org/pkg/"],
                ),
            ),
            (
                "https://golang.org/pkg/os/",
                page(
                    "Package os",
                    &["https://golang.org/", "https://golang.org/pkg/"],
                ),
            ),
        ])
    }

    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let pages: HashMap<String, Page> = serde_json::from_str(json)?;
        Ok(Self::from_pages(pages))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, GraphError> {
        let json = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Delays every fetch by `latency`, so concurrent tasks overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// How many times `url` has been requested from this fetcher.
    pub fn calls(&self, url: &str) -> usize {
        self.call_counts().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.call_counts().values().sum()
    }

    fn call_counts(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        *self.call_counts().entry(url.to_string()).or_insert(0) += 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::not_found(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_serves_known_page() {
        let fetcher = FakeFetcher::golang_fixture();
        let page = fetcher.fetch("https://golang.org/pkg/fmt/").await.unwrap();
        assert_eq!(page.body, "Package fmt");
        assert_eq!(
            page.links,
            vec!["https://golang.org/", "https://golang.org/pkg/"]
        );
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found() {
        let fetcher = FakeFetcher::golang_fixture();
        let err = fetcher.fetch("https://golang.org/cmd/").await.unwrap_err();
        assert_eq!(err, FetchError::not_found("https://golang.org/cmd/"));
    }

    #[tokio::test]
    async fn test_calls_are_counted_per_url() {
        let fetcher = FakeFetcher::golang_fixture();
        fetcher.fetch("https://golang.org/").await.unwrap();
        fetcher.fetch("https://golang.org/").await.unwrap();
        let _ = fetcher.fetch("https://golang.org/cmd/").await;

        assert_eq!(fetcher.calls("https://golang.org/"), 2);
        assert_eq!(fetcher.calls("https://golang.org/cmd/"), 1);
        assert_eq!(fetcher.calls("https://golang.org/pkg/"), 0);
        assert_eq!(fetcher.total_calls(), 3);
    }

    #[test]
    fn test_graph_from_json() {
        let json = r#"{
            "A": { "body": "a", "links": ["B"] },
            "B": { "body": "b" }
        }"#;
        let fetcher = FakeFetcher::from_json_str(json).unwrap();
        assert_eq!(fetcher.len(), 2);
    }

    #[test]
    fn test_graph_rejects_bad_json() {
        let err = FakeFetcher::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, GraphError::Parse(_)));
    }

    #[test]
    fn test_graph_missing_file() {
        let err = FakeFetcher::from_json_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}

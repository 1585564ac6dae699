// src/fetch/mod.rs
// =============================================================================
// This module defines how pages are retrieved.
//
// Submodules:
// - fake: A fetcher backed by an in-memory table of pages
// - cache: A wrapper that memoizes any other fetcher
//
// Everything that can turn a URL into a page implements the `Fetcher` trait,
// so the crawler never needs to know where pages actually come from.
//
// Rust concepts:
// - Traits: Shared behavior across different types
// - async-trait: Lets a trait have async methods and still be used as `dyn`
// - thiserror: Derives std::error::Error for our error type
// =============================================================================

mod cache;
mod fake;

pub use cache::{CachePolicy, CacheStats, CachingFetcher};
pub use fake::FakeFetcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A retrieved page: its body and the URLs it links to, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub body: String,
    #[serde(default)]
    pub links: Vec<String>,
}

impl Page {
    pub fn new(body: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            body: body.into(),
            links,
        }
    }
}

/// The only way a retrieval can fail.
///
/// Displays as `<cause>: <url>`, e.g. `not found: https://golang.org/cmd/`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{cause}: {url}")]
pub struct FetchError {
    pub url: String,
    pub cause: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cause: cause.into(),
        }
    }

    pub fn not_found(url: &str) -> Self {
        Self::new(url, "not found")
    }
}

/// Turns a URL into a page.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why #[async_trait]?
//    - Plain `async fn` in traits can't be used through `dyn Fetcher`
//    - async_trait rewrites the method to return a boxed future
//    - The boxed future is `Send`, so tokio::spawn accepts it
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::not_found("https://golang.org/cmd/");
        assert_eq!(err.to_string(), "not found: https://golang.org/cmd/");
    }

    #[test]
    fn test_page_links_default_to_empty() {
        let page: Page = serde_json::from_str(r#"{ "body": "leaf" }"#).unwrap();
        assert_eq!(page, Page::new("leaf", vec![]));
    }

    #[tokio::test]
    async fn test_fetcher_works_as_trait_object() {
        let fake = FakeFetcher::from_pages([("a", Page::new("A", vec![]))]);
        let fetcher: Arc<dyn Fetcher> = Arc::new(fake);
        assert_eq!(fetcher.fetch("a").await.unwrap().body, "A");
    }
}

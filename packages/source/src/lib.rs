#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Page fetcher for FRED series metadata.
//!
//! The harvest loop only ever asks for one page at a time through the
//! [`PageFetcher`] trait. [`fred::FredClient`] is the production
//! implementation backed by the `/fred/series/updates` endpoint.
//!
//! Fetchers never retry. A failed page surfaces as a [`SourceError`] and
//! the caller decides what to do with it.

pub mod fred;

use async_trait::async_trait;
use fred_metadata_series_models::SeriesPage;

pub use fred::FredClient;

/// Errors that can occur while fetching a page from the remote source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport-level failure (connect, timeout, body read). The request
    /// URL is stripped since it carries the API key.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    Status {
        /// Response status code.
        status: reqwest::StatusCode,
        /// Request URL without query parameters.
        url: String,
        /// Leading part of the response body.
        message: String,
    },

    /// The response body was not a valid series page.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A source of paginated series metadata.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches up to `limit` records starting at `offset`.
    ///
    /// An empty page means there is nothing left to fetch.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the response cannot
    /// be decoded.
    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<SeriesPage, SourceError>;
}

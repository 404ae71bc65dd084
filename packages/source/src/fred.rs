//! Client for the FRED `/series/updates` endpoint.

use async_trait::async_trait;
use fred_metadata_series_models::SeriesPage;

use crate::{PageFetcher, SourceError};

/// Base URL of the FRED API.
pub const FRED_API_BASE: &str = "https://api.stlouisfed.org/fred";

/// Path of the series-updates endpoint, relative to [`FRED_API_BASE`].
pub const SERIES_UPDATES_PATH: &str = "/series/updates";

/// Largest page size the endpoint accepts.
pub const MAX_PAGE_LIMIT: u64 = 1000;

const FILE_TYPE: &str = "json";

/// Maximum length of the response body included in status errors.
const BODY_PREVIEW_LEN: usize = 500;

/// Fetches pages of recently updated series from FRED.
pub struct FredClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FredClient {
    /// Creates a client for the public FRED API.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: FRED_API_BASE.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Points the client at a different API root (e.g. a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Performs one request against the series-updates endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] on transport failure,
    /// [`SourceError::Status`] on a non-2xx response, and
    /// [`SourceError::Json`] if the body is not a series page.
    pub async fn series_updates(&self, offset: u64, limit: u64) -> Result<SeriesPage, SourceError> {
        let url = format!("{}{SERIES_UPDATES_PATH}", self.base_url);
        log::info!("Making request to {url} (offset={offset}, limit={limit})");

        let limit = limit.to_string();
        let offset = offset.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("file_type", FILE_TYPE),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status,
                url,
                message: body.chars().take(BODY_PREVIEW_LEN).collect(),
            });
        }

        let text = response.text().await.map_err(reqwest::Error::without_url)?;
        let page: SeriesPage = serde_json::from_str(&text)?;

        log::debug!(
            "  received {} series (count={:?})",
            page.records.len(),
            page.count
        );

        Ok(page)
    }
}

#[async_trait]
impl PageFetcher for FredClient {
    async fn fetch_page(&self, offset: u64, limit: u64) -> Result<SeriesPage, SourceError> {
        self.series_updates(offset, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_pagination_parameters_and_parses_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/series/updates"))
            .and(query_param("api_key", "secret"))
            .and(query_param("file_type", "json"))
            .and(query_param("limit", "1000"))
            .and(query_param("offset", "2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3001,
                "offset": 2000,
                "limit": 1000,
                "seriess": [
                    { "id": "GDP", "popularity": 93, "frequency": "Quarterly" },
                    { "id": "DGS10", "popularity": 80, "frequency": "Daily" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = FredClient::new("secret").with_base_url(&server.uri());
        let page = client.fetch_page(2000, 1000).await.unwrap();

        assert_eq!(page.count, Some(3001));
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[1].id.as_deref(), Some("DGS10"));
    }

    #[tokio::test]
    async fn empty_seriess_is_an_empty_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/series/updates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "seriess": [] })))
            .mount(&server)
            .await;

        let client = FredClient::new("k").with_base_url(&server.uri());
        let page = client.fetch_page(0, 1000).await.unwrap();

        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_without_retry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/series/updates"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&server)
            .await;

        let client = FredClient::new("secret").with_base_url(&server.uri());
        let err = client.fetch_page(0, 1000).await.unwrap_err();

        match err {
            SourceError::Status {
                status,
                url,
                message,
            } => {
                assert_eq!(status.as_u16(), 500);
                assert!(!url.contains("secret"), "api key leaked into error: {url}");
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/series/updates"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = FredClient::new("k").with_base_url(&server.uri());
        let err = client.fetch_page(0, 1000).await.unwrap_err();

        assert!(matches!(err, SourceError::Json(_)));
    }
}

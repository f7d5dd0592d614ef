//! Site API client
//!
//! Two GET endpoints are used: region membership (`labelsByKey`) and the
//! site listing of one country (`sitesByLabelIdAndSiteName`). Both return raw
//! JSON that is cached as-is, so the client hands back `serde_json::Value`.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::observe::SharedObserver;
use crate::session::{SessionConfig, SessionError};

/// Path of the region membership endpoint
const REGION_PATH: &str = "/open/label/labelsByKey";

/// Path of the per-country site listing endpoint
const SITES_PATH: &str = "/open/site-tab/sitesByLabelIdAndSiteName";

/// Language requested from the API
const LANGUAGE: &str = "EN";

/// Errors that can occur when talking to the site API
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or body transfer failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// The body is not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The HTTP client could not be built from the session
    #[error("Invalid session: {0}")]
    Session(#[from] SessionError),
}

/// Source of region and site payloads
///
/// Implemented by [`CiClient`] for the live API; tests provide stubs.
#[async_trait]
pub trait SiteSource: Send + Sync {
    /// Fetches the membership payload of a region label
    async fn fetch_countries_by_region(&self, region_label: &str) -> Result<Value, FetchError>;

    /// Fetches the site listing of a country label key
    async fn fetch_site_data_by_country(&self, label_key: &str) -> Result<Value, FetchError>;
}

/// Client for the live site API
#[derive(Clone)]
pub struct CiClient {
    http_client: Client,
    base_url: String,
    observer: SharedObserver,
}

impl std::fmt::Debug for CiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CiClient {
    /// Creates a client that replays the session's headers and cookies
    pub fn new(session: &SessionConfig, observer: SharedObserver) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .default_headers(session.header_map()?)
            .build()?;
        Ok(Self {
            http_client,
            base_url: session.base_url.trim_end_matches('/').to_string(),
            observer,
        })
    }

    /// Sends one GET and parses the body as JSON
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        let request = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .build()?;
        let url = request.url().to_string();
        self.observer
            .info(&format!("Request: {} {}", url, request.method()));

        let response = self.http_client.execute(request).await?;
        let status = response.status();
        self.observer
            .info(&format!("Response: {} {}", url, status.as_u16()));

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Logs a failed fetch with its context before passing it on
    fn report<T>(&self, what: &str, key: &str, result: Result<T, FetchError>) -> Result<T, FetchError> {
        if let Err(e) = &result {
            self.observer
                .error(&format!("Error fetching {} for {}: {}", what, key, e));
        }
        result
    }
}

#[async_trait]
impl SiteSource for CiClient {
    async fn fetch_countries_by_region(&self, region_label: &str) -> Result<Value, FetchError> {
        let result = self
            .get_json(
                REGION_PATH,
                &[("labelKey", region_label), ("language", LANGUAGE)],
            )
            .await;
        self.report("countries", region_label, result)
    }

    async fn fetch_site_data_by_country(&self, label_key: &str) -> Result<Value, FetchError> {
        let result = self
            .get_json(
                SITES_PATH,
                &[("labelId", label_key), ("siteName", ""), ("language", LANGUAGE)],
            )
            .await;
        self.report("site data", label_key, result)
    }
}

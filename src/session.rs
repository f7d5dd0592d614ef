//! Remote API session configuration
//!
//! The site API only answers requests that look like they come from a
//! browser session. The headers and cookies that make up that session are
//! environment specific and expire, so they are loaded from a JSON file
//! rather than compiled in. Only non-credential defaults live here.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default API host
pub const DEFAULT_BASE_URL: &str = "https://ci.cn";

/// Errors that can occur when loading or applying a session file
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session file could not be read
    #[error("Failed to read session file: {0}")]
    Io(#[from] std::io::Error),

    /// The session file is not valid JSON for a session
    #[error("Failed to parse session file: {0}")]
    Parse(#[from] serde_json::Error),

    /// A header name or value cannot be sent over HTTP
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),
}

/// Headers and cookies replayed on every API request
///
/// # Example session file
/// ```json
/// {
///   "base_url": "https://ci.cn",
///   "headers": { "User-Agent": "Mozilla/5.0 ..." },
///   "cookies": { "__jsluid_s": "..." }
/// }
/// ```
/// Missing fields fall back to the defaults; listed headers override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub base_url: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

fn default_headers() -> BTreeMap<String, String> {
    [
        ("Accept", "*/*"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("DNT", "1"),
        ("Referer", "https://ci.cn/en/qqwl/qqky"),
        ("Sec-Fetch-Dest", "empty"),
        ("Sec-Fetch-Mode", "cors"),
        ("Sec-Fetch-Site", "same-origin"),
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        ),
        ("X-Requested-With", "XMLHttpRequest"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headers: default_headers(),
            cookies: BTreeMap::new(),
        }
    }
}

impl SessionConfig {
    /// Parses a session from JSON, layering its headers over the defaults
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let mut parsed: SessionConfig = serde_json::from_str(json)?;
        let mut headers = default_headers();
        headers.append(&mut parsed.headers);
        parsed.headers = headers;
        Ok(parsed)
    }

    /// Loads a session file from disk
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Overrides the API host, mostly for tests
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The `Cookie` header value, `None` when there are no cookies
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Builds the header map installed on the HTTP client
    pub fn header_map(&self) -> Result<HeaderMap, SessionError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| SessionError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| SessionError::InvalidHeader(name.clone()))?;
            map.insert(header_name, header_value);
        }
        if let Some(cookie) = self.cookie_header() {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|_| SessionError::InvalidHeader("Cookie".to_string()))?;
            map.insert(COOKIE, value);
        }
        Ok(map)
    }
}

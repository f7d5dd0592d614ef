//! Core data model for the label harvester
//!
//! Region labels are the fixed top-level groupings the API exposes. Each
//! region payload lists the country label keys it contains, and each country
//! label key in turn has a site listing of its own.

pub mod client;

pub use client::{CiClient, FetchError, SiteSource};

use serde_json::Value;
use thiserror::Error;

/// One of the five top-level region groupings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Africa,
    Asia,
    Europe,
    America,
    Oceania,
}

impl Region {
    /// Every region, in processing order
    pub const ALL: [Region; 5] = [
        Region::Africa,
        Region::Asia,
        Region::Europe,
        Region::America,
        Region::Oceania,
    ];

    /// The label string the API and the on-disk files use
    pub fn label(&self) -> &'static str {
        match self {
            Region::Africa => "C-Africa",
            Region::Asia => "C-Asia",
            Region::Europe => "C-Europe",
            Region::America => "C-America",
            Region::Oceania => "C-Oceania",
        }
    }

    /// Parses a region from its label (`C-Asia`) or bare name (`asia`),
    /// case-insensitively.
    pub fn from_label(s: &str) -> Option<Region> {
        let lower = s.trim().to_lowercase();
        let name = lower.strip_prefix("c-").unwrap_or(&lower);
        Region::ALL
            .into_iter()
            .find(|region| region.label()[2..].eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors raised when a region payload lacks the expected shape
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// There is no `data` array at the top level
    #[error("payload has no 'data' array")]
    MissingData,

    /// An entry in `data` has no string `labelKey`
    #[error("entry {0} in 'data' has no string 'labelKey'")]
    MissingLabelKey(usize),
}

/// Whether a cached region payload carries anything worth using
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Extracts `data[].labelKey` from a region payload, in payload order
///
/// Blank keys name no country and are dropped.
pub fn extract_label_keys(payload: &Value) -> Result<Vec<String>, PayloadError> {
    let entries = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or(PayloadError::MissingData)?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .get("labelKey")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(PayloadError::MissingLabelKey(index))
        })
        .filter(|key| !matches!(key, Ok(key) if key.trim().is_empty()))
        .collect()
}

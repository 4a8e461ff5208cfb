//! Request and response models for the HTTP endpoints.

use serde::{Deserialize, Serialize};

use webrisk_core::{EngineError, Stats};

/// Returns the first value of `key` in a raw query string.
fn first_value(raw: Option<&str>, key: &str) -> Option<String> {
    url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Query parameters for the lookup endpoint.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FormatQuery {
    /// Explicit wire format selector (`json`, `proto`, or a MIME type).
    pub alt: Option<String>,
}

impl FormatQuery {
    /// Parses the raw query string. Repeated keys keep their first value.
    pub fn parse(raw: Option<&str>) -> Self {
        Self {
            alt: first_value(raw, "alt"),
        }
    }
}

/// Query parameters for the redirector.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RedirectQuery {
    /// Target URL to check. Empty counts as absent.
    pub url: Option<String>,
}

impl RedirectQuery {
    /// Parses the raw query string. Repeated keys keep their first value.
    pub fn parse(raw: Option<&str>) -> Self {
        Self {
            url: first_value(raw, "url").filter(|url| !url.is_empty()),
        }
    }
}

/// Response for GET /status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusResponse {
    /// Engine counters.
    pub stats: Stats,
    /// The engine's last error, or empty.
    pub error: String,
}

impl StatusResponse {
    /// Builds the response from an engine status report.
    pub fn new(stats: Stats, error: Option<EngineError>) -> Self {
        Self {
            stats,
            error: error.map(|e| e.to_string()).unwrap_or_default(),
        }
    }
}

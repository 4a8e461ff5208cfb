//! Web Risk `uris:search` API client.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use webrisk_core::ThreatType;

use crate::config::EngineConfig;
use crate::error::{ClientError, ConfigError, Result};

/// Path of the search endpoint below the API base.
const SEARCH_URIS_PATH: &str = "/v1/uris:search";

/// Longest API error body kept in error messages.
const MAX_ERROR_BODY: usize = 256;

/// The API's answer for one URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriVerdict {
    /// Threat types in API order. Empty means no threat was found.
    pub threat_types: Vec<ThreatType>,
    /// How long a positive answer may be cached.
    pub expire_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchUrisResponse {
    #[serde(default)]
    threat: Option<ThreatUri>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreatUri {
    #[serde(default)]
    threat_types: Vec<String>,
    #[serde(default)]
    expire_time: Option<DateTime<Utc>>,
}

impl From<SearchUrisResponse> for UriVerdict {
    fn from(resp: SearchUrisResponse) -> Self {
        let Some(threat) = resp.threat else {
            return UriVerdict::default();
        };

        let threat_types = threat
            .threat_types
            .iter()
            .filter_map(|name| match name.parse::<ThreatType>() {
                Ok(t) => Some(t),
                Err(_) => {
                    warn!(threat_type = %name, "Ignoring unknown threat type from API");
                    None
                }
            })
            .collect();

        UriVerdict {
            threat_types,
            expire_time: threat.expire_time,
        }
    }
}

/// Thin client for the search endpoint.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    search_url: Url,
    api_key: String,
    threat_types: Vec<ThreatType>,
    log_queries: bool,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("search_url", &self.search_url.as_str())
            .field("threat_types", &self.threat_types)
            .field("log_queries", &self.log_queries)
            .finish()
    }
}

impl ApiClient {
    /// Creates a client from the engine configuration.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);

        if let Some(ref proxy_url) = config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url.as_str())
                .map_err(|e| ConfigError::InvalidProxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let search_url =
            Url::parse(config.api_base.trim_end_matches('/'))?.join(SEARCH_URIS_PATH)?;

        Ok(Self {
            http: builder.build()?,
            search_url,
            api_key: config.api_key.clone(),
            threat_types: config.threat_types.clone(),
            log_queries: config.log_api_queries,
        })
    }

    /// Builds the request URL for `uri`.
    fn request_url(&self, uri: &str) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("key", &self.api_key);
            query.append_pair("uri", uri);
            for threat_type in &self.threat_types {
                query.append_pair("threatTypes", threat_type.as_str());
            }
        }
        url
    }

    /// Asks the API whether `uri` is on any subscribed threat list.
    pub async fn search_uri(&self, uri: &str) -> Result<UriVerdict> {
        if self.log_queries {
            info!(uri, "Querying Web Risk API");
        } else {
            debug!(uri, "Querying Web Risk API");
        }

        let resp = self.http.get(self.request_url(uri)).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let mut message = resp.text().await.unwrap_or_default();
            let cut = message
                .char_indices()
                .nth(MAX_ERROR_BODY)
                .map(|(i, _)| i)
                .unwrap_or(message.len());
            message.truncate(cut);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let body: SearchUrisResponse = resp.json().await?;
        Ok(body.into())
    }
}

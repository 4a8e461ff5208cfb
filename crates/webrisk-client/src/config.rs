//! Engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use webrisk_core::ThreatType;

use crate::error::ConfigError;

/// Default Web Risk API endpoint.
pub const DEFAULT_API_BASE: &str = "https://webrisk.googleapis.com";

/// Default timeout for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`crate::RemoteEngine`].
#[derive(Clone)]
pub struct EngineConfig {
    /// Web Risk API key.
    pub api_key: String,
    /// API base URL (scheme and host).
    pub api_base: String,
    /// Outbound proxy for API calls.
    pub proxy_url: Option<String>,
    /// Verdict cache path (None = in-memory).
    pub db_path: Option<PathBuf>,
    /// Threat types to check URLs against.
    pub threat_types: Vec<ThreatType>,
    /// Minimum time to cache positive verdicts.
    pub positive_min_ttl: Duration,
    /// Minimum time to cache negative verdicts. Zero disables negative caching.
    pub negative_min_ttl: Duration,
    /// Log every query sent to the API.
    pub log_api_queries: bool,
    /// Timeout for a single API request.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("proxy_url", &self.proxy_url)
            .field("db_path", &self.db_path)
            .field("threat_types", &self.threat_types)
            .field("positive_min_ttl", &self.positive_min_ttl)
            .field("negative_min_ttl", &self.negative_min_ttl)
            .field("log_api_queries", &self.log_api_queries)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            proxy_url: None,
            db_path: None,
            threat_types: ThreatType::all().to_vec(),
            positive_min_ttl: Duration::ZERO,
            negative_min_ttl: Duration::ZERO,
            log_api_queries: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Sets the outbound proxy. An empty string means no proxy.
    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        let proxy_url = proxy_url.into();
        self.proxy_url = (!proxy_url.is_empty()).then_some(proxy_url);
        self
    }

    /// Sets the verdict cache path.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Sets the subscribed threat types.
    pub fn with_threat_types(mut self, threat_types: Vec<ThreatType>) -> Self {
        self.threat_types = threat_types;
        self
    }

    /// Sets the minimum cache durations for positive and negative verdicts.
    pub fn with_min_ttls(mut self, positive: Duration, negative: Duration) -> Self {
        self.positive_min_ttl = positive;
        self.negative_min_ttl = negative;
        self
    }

    /// Enables logging of API queries.
    pub fn with_api_query_logging(mut self, enabled: bool) -> Self {
        self.log_api_queries = enabled;
        self
    }

    /// Checks that the configuration can start an engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.threat_types.is_empty() {
            return Err(ConfigError::NoThreatTypes);
        }
        Ok(())
    }
}

/// Parses a duration such as `300ms`, `1.5h` or `2h45m`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. An empty string
/// and a bare `0` both mean zero. Negative durations are rejected.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(value.to_string());

    let mut rest = value.trim();
    if rest.is_empty() || rest == "0" {
        return Ok(Duration::ZERO);
    }
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let number: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total_nanos += number * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

//! The threat evaluation capability consumed by the protocol layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::threat::ThreatMatch;

/// Query counters reported by an engine.
///
/// Field names serialize in the casing clients of the status endpoint expect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Stats {
    /// Lookups answered from the local verdict cache.
    pub queries_by_cache: u64,
    /// Lookups forwarded to the remote API.
    #[serde(rename = "QueriesByAPI")]
    pub queries_by_api: u64,
    /// Lookups that failed.
    pub queries_fail: u64,
    /// Verdicts currently held in the cache.
    pub cached_verdicts: u64,
}

/// A backing engine that evaluates URLs against threat lists.
///
/// Implementations must be safe to share across concurrent request handlers.
/// Dropping the future returned by [`ThreatEngine::lookup_urls`] cancels the
/// lookup.
#[async_trait]
pub trait ThreatEngine: Send + Sync {
    /// Looks up each URL, returning one match list per input URL, in order.
    async fn lookup_urls(&self, urls: &[String]) -> Result<Vec<Vec<ThreatMatch>>, EngineError>;

    /// Returns current statistics and the engine's most recent error, if any.
    fn status(&self) -> (Stats, Option<EngineError>);
}

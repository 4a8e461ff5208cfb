//! Lookup aggregation: reduces raw engine matches into a lookup response.

use std::collections::HashSet;

use tracing::debug;

use crate::codec::LookupResponse;
use crate::engine::ThreatEngine;
use crate::error::EngineError;
use crate::threat::{ThreatMatch, ThreatType};

/// Reduces match lists into a response.
///
/// Every threat type appears once, in order of first appearance across all
/// lists.
pub fn aggregate(results: &[Vec<ThreatMatch>]) -> LookupResponse {
    let mut seen: HashSet<ThreatType> = HashSet::new();
    let threat_types = results
        .iter()
        .flatten()
        .map(|m| m.threat_type)
        .filter(|t| seen.insert(*t))
        .collect();

    LookupResponse { threat_types }
}

/// Looks up a single URI and returns its distinct threat types.
///
/// Nothing is returned unless the engine call succeeds as a whole.
pub async fn lookup(engine: &dyn ThreatEngine, uri: &str) -> Result<LookupResponse, EngineError> {
    let results = engine.lookup_urls(&[uri.to_string()]).await?;
    if results.len() != 1 {
        return Err(EngineError::Malformed(format!(
            "expected 1 result set, got {}",
            results.len()
        )));
    }
    let response = aggregate(&results);

    debug!(uri, threat_types = ?response.threat_types, "Lookup complete");
    Ok(response)
}

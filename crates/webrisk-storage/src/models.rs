//! Data models for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webrisk_core::ThreatType;

/// A cached lookup verdict for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// The URL exactly as it was queried.
    pub url: String,
    /// Threat types reported for the URL, in API order. Empty means safe.
    pub threat_types: Vec<ThreatType>,
    /// When the verdict stops being usable.
    pub expires_at: DateTime<Utc>,
}

impl Verdict {
    /// Returns true if the URL was reported as unsafe.
    pub fn is_positive(&self) -> bool {
        !self.threat_types.is_empty()
    }

    /// Returns true if the verdict is still usable at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

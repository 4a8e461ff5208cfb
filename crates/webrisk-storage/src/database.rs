//! High-level database interface.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::Verdict;
use crate::pool::ConnectionPool;
use crate::repository::VerdictsRepo;

/// High-level verdict cache.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open (or create) a database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the fresh verdict for a URL, if any.
    pub fn cached_verdict(&self, url: &str) -> Result<Option<Verdict>> {
        let conn = self.pool.get()?;
        VerdictsRepo::get(&conn, url, Utc::now())
    }

    /// Store a verdict, replacing any previous one for the same URL.
    pub fn store_verdict(&self, verdict: &Verdict) -> Result<()> {
        let conn = self.pool.get()?;
        VerdictsRepo::upsert(&conn, verdict)
    }

    /// Remove expired verdicts.
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let purged = VerdictsRepo::purge_expired(&conn, Utc::now())?;
        if purged > 0 {
            debug!(purged, "Purged expired verdicts");
        }
        Ok(purged)
    }

    /// Count fresh verdicts.
    pub fn count_verdicts(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        VerdictsRepo::count_fresh(&conn, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;
    use webrisk_core::ThreatType;

    #[test]
    fn test_in_memory_roundtrip() {
        let db = Database::in_memory().unwrap();

        db.store_verdict(&Verdict {
            url: "http://bad.example/".to_string(),
            threat_types: vec![ThreatType::Malware],
            expires_at: Utc::now() + Duration::minutes(10),
        })
        .unwrap();

        let cached = db.cached_verdict("http://bad.example/").unwrap().unwrap();
        assert_eq!(cached.threat_types, vec![ThreatType::Malware]);
        assert_eq!(db.count_verdicts().unwrap(), 1);
        assert!(db.cached_verdict("http://other.example/").unwrap().is_none());
    }

    #[test]
    fn test_verdicts_persist_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache").join("webrisk.db");

        {
            let db = Database::with_path(&path).unwrap();
            db.store_verdict(&Verdict {
                url: "http://good.example/".to_string(),
                threat_types: vec![],
                expires_at: Utc::now() + Duration::hours(1),
            })
            .unwrap();
        }

        let db = Database::with_path(&path).unwrap();
        let cached = db.cached_verdict("http://good.example/").unwrap().unwrap();
        assert!(!cached.is_positive());
    }

    #[test]
    fn test_purge_expired() {
        let db = Database::in_memory().unwrap();
        db.store_verdict(&Verdict {
            url: "http://stale.example/".to_string(),
            threat_types: vec![],
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .unwrap();

        assert_eq!(db.purge_expired().unwrap(), 1);
        assert_eq!(db.count_verdicts().unwrap(), 0);
    }
}

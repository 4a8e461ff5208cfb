//! Verdict cache repository.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use webrisk_core::ThreatType;

use crate::error::Result;
use crate::models::Verdict;

/// Repository for cached lookup verdicts.
pub struct VerdictsRepo;

impl VerdictsRepo {
    /// Get the verdict for a URL if it has not expired at `now`.
    pub fn get(conn: &Connection, url: &str, now: DateTime<Utc>) -> Result<Option<Verdict>> {
        let row: Option<(String, String, i64)> = conn
            .query_row(
                "SELECT url, threat_types, expires_at FROM verdicts
                 WHERE url = ?1 AND expires_at > ?2",
                params![url, now.timestamp_millis()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((url, threat_types, expires_at)) = row else {
            return Ok(None);
        };

        let threat_types: Vec<ThreatType> = serde_json::from_str(&threat_types)?;
        let expires_at = Utc
            .timestamp_millis_opt(expires_at)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Some(Verdict {
            url,
            threat_types,
            expires_at,
        }))
    }

    /// Insert or replace the verdict for a URL.
    pub fn upsert(conn: &Connection, verdict: &Verdict) -> Result<()> {
        let threat_types = serde_json::to_string(&verdict.threat_types)?;

        conn.execute(
            "INSERT INTO verdicts (url, threat_types, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(url) DO UPDATE SET threat_types = ?2, expires_at = ?3",
            params![verdict.url, threat_types, verdict.expires_at.timestamp_millis()],
        )?;

        Ok(())
    }

    /// Delete every verdict that has expired at `now`. Returns the number removed.
    pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
        let deleted = conn.execute(
            "DELETE FROM verdicts WHERE expires_at <= ?1",
            [now.timestamp_millis()],
        )?;
        Ok(deleted)
    }

    /// Count verdicts that are still fresh at `now`.
    pub fn count_fresh(conn: &Connection, now: DateTime<Utc>) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM verdicts WHERE expires_at > ?1",
            [now.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

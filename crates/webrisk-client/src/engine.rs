//! Caching threat engine backed by the Web Risk API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use webrisk_core::{EngineError, Stats, ThreatEngine, ThreatMatch};
use webrisk_storage::{Database, StorageError, Verdict};

use crate::api::{ApiClient, UriVerdict};
use crate::config::EngineConfig;
use crate::error::Result;

#[derive(Debug, Default)]
struct Counters {
    by_cache: AtomicU64,
    by_api: AtomicU64,
    failed: AtomicU64,
}

/// Threat engine that answers from the verdict cache and falls back to the API.
pub struct RemoteEngine {
    api: ApiClient,
    cache: Database,
    positive_min_ttl: Duration,
    negative_min_ttl: Duration,
    counters: Counters,
    last_error: Mutex<Option<EngineError>>,
}

impl std::fmt::Debug for RemoteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEngine")
            .field("api", &self.api)
            .field("positive_min_ttl", &self.positive_min_ttl)
            .field("negative_min_ttl", &self.negative_min_ttl)
            .field("counters", &self.counters)
            .finish()
    }
}

/// Adds `ttl` to `now`, saturating at the largest representable time.
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl RemoteEngine {
    /// Creates an engine, opening the verdict cache.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let cache = match config.db_path {
            Some(ref path) => Database::with_path(path)?,
            None => Database::in_memory()?,
        };

        Self::with_cache(config, cache)
    }

    /// Creates an engine with an existing verdict cache.
    pub fn with_cache(config: EngineConfig, cache: Database) -> Result<Self> {
        config.validate()?;
        let api = ApiClient::new(&config)?;

        info!(
            threat_types = ?config.threat_types,
            positive_min_ttl = ?config.positive_min_ttl,
            negative_min_ttl = ?config.negative_min_ttl,
            "Web Risk engine ready"
        );

        Ok(Self {
            api,
            cache,
            positive_min_ttl: config.positive_min_ttl,
            negative_min_ttl: config.negative_min_ttl,
            counters: Counters::default(),
            last_error: Mutex::new(None),
        })
    }

    /// Runs one cache operation on the blocking pool.
    async fn on_cache<T, F>(&self, op: F) -> webrisk_storage::Result<T>
    where
        F: FnOnce(&Database) -> webrisk_storage::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || op(&cache))
            .await
            .map_err(|e| StorageError::Config(format!("cache task failed: {}", e)))?
    }

    /// Drops expired verdicts from the cache.
    pub async fn purge_expired(&self) -> usize {
        match self.on_cache(|cache| cache.purge_expired()).await {
            Ok(purged) => purged,
            Err(e) => {
                warn!("Failed to purge verdict cache: {}", e);
                0
            }
        }
    }

    /// Computes how long a fresh API answer may be reused. None means do not cache.
    fn verdict_expiry(&self, verdict: &UriVerdict, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if verdict.threat_types.is_empty() {
            if self.negative_min_ttl.is_zero() {
                return None;
            }
            return Some(expiry_after(now, self.negative_min_ttl));
        }

        let floor = expiry_after(now, self.positive_min_ttl);
        let expires_at = verdict.expire_time.map_or(floor, |t| t.max(floor));
        (expires_at > now).then_some(expires_at)
    }

    fn to_matches(url: &str, verdict: &Verdict) -> Vec<ThreatMatch> {
        verdict
            .threat_types
            .iter()
            .map(|t| ThreatMatch::new(*t, url))
            .collect()
    }

    async fn lookup_one(&self, url: &str) -> std::result::Result<Vec<ThreatMatch>, EngineError> {
        let key = url.to_string();
        match self.on_cache(move |cache| cache.cached_verdict(&key)).await {
            Ok(Some(verdict)) => {
                self.counters.by_cache.fetch_add(1, Ordering::Relaxed);
                debug!(url, "Verdict served from cache");
                return Ok(Self::to_matches(url, &verdict));
            }
            Ok(None) => {}
            Err(e) => warn!(url, "Verdict cache read failed: {}", e),
        }

        self.counters.by_api.fetch_add(1, Ordering::Relaxed);
        let answer = match self.api.search_uri(url).await {
            Ok(answer) => answer,
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                let err = EngineError::Unavailable(e.to_string());
                *self.last_error.lock() = Some(err.clone());
                return Err(err);
            }
        };
        *self.last_error.lock() = None;

        let now = Utc::now();
        let verdict = Verdict {
            url: url.to_string(),
            threat_types: answer.threat_types.clone(),
            expires_at: self.verdict_expiry(&answer, now).unwrap_or(now),
        };
        if verdict.is_fresh(now) {
            let stored = verdict.clone();
            if let Err(e) = self.on_cache(move |cache| cache.store_verdict(&stored)).await {
                warn!(url, "Verdict cache write failed: {}", e);
            }
        }

        Ok(Self::to_matches(url, &verdict))
    }
}

#[async_trait]
impl ThreatEngine for RemoteEngine {
    async fn lookup_urls(
        &self,
        urls: &[String],
    ) -> std::result::Result<Vec<Vec<ThreatMatch>>, EngineError> {
        try_join_all(urls.iter().map(|url| self.lookup_one(url))).await
    }

    fn status(&self) -> (Stats, Option<EngineError>) {
        let mut error = self.last_error.lock().clone();

        // A single indexed COUNT; cheap enough to run inline.

        let cached_verdicts = match self.cache.count_verdicts() {
            Ok(count) => count.max(0) as u64,
            Err(e) => {
                error.get_or_insert_with(|| EngineError::Unavailable(e.to_string()));
                0
            }
        };

        let stats = Stats {
            queries_by_cache: self.counters.by_cache.load(Ordering::Relaxed),
            queries_by_api: self.counters.by_api.load(Ordering::Relaxed),
            queries_fail: self.counters.failed.load(Ordering::Relaxed),
            cached_verdicts,
        };

        (stats, error)
    }
}

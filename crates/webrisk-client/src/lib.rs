//! Web Risk Client - remote threat engine.
//!
//! Answers URL lookups by querying the Web Risk `uris:search` API and caches
//! the answers in the SQLite verdict cache from `webrisk-storage`.
//!
//! ## Caching
//!
//! - Unsafe verdicts are kept until the API's expire time, but never for
//!   less than the positive minimum TTL.
//! - Safe verdicts are kept for the negative minimum TTL. Zero disables
//!   negative caching.
//!
//! ```text
//! lookup(url) → cache fresh? ── yes ──→ cached matches
//!                    │
//!                    no
//!                    ▼
//!              uris:search API ──→ store verdict ──→ matches
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;

pub use api::{ApiClient, UriVerdict};
pub use config::{parse_duration, EngineConfig, DEFAULT_API_BASE, DEFAULT_REQUEST_TIMEOUT};
pub use engine::RemoteEngine;
pub use error::{ClientError, ConfigError, Result};

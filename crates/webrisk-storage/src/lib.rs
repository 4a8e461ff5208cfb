//! Web Risk Storage - SQLite verdict cache.
//!
//! Stores lookup verdicts (positive and negative) with an expiry so repeated
//! lookups for the same URL can be answered without calling the remote API.
//!
//! # Example
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use webrisk_core::ThreatType;
//! use webrisk_storage::{Database, Verdict};
//!
//! let db = Database::in_memory().unwrap();
//!
//! db.store_verdict(&Verdict {
//!     url: "http://bad.example/".to_string(),
//!     threat_types: vec![ThreatType::Malware],
//!     expires_at: Utc::now() + Duration::minutes(5),
//! }).unwrap();
//!
//! assert!(db.cached_verdict("http://bad.example/").unwrap().is_some());
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::Verdict;
pub use pool::ConnectionPool;
pub use repository::VerdictsRepo;

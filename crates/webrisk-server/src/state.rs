//! Application state for the HTTP server.

use std::sync::Arc;

use webrisk_core::ThreatEngine;

use crate::assets::{AssetStore, EmbeddedAssets};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Threat engine answering lookups.
    pub engine: Arc<dyn ThreatEngine>,
    /// Templates and static files.
    pub assets: Arc<dyn AssetStore>,
}

impl AppState {
    /// Creates state with the embedded assets.
    pub fn new(engine: Arc<dyn ThreatEngine>) -> Self {
        Self::with_assets(engine, Arc::new(EmbeddedAssets))
    }

    /// Creates state with a custom asset store.
    pub fn with_assets(engine: Arc<dyn ThreatEngine>, assets: Arc<dyn AssetStore>) -> Self {
        Self { engine, assets }
    }
}

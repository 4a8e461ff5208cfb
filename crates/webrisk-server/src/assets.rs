//! Interstitial templates and static files.

use std::borrow::Cow;

use thiserror::Error;

/// Errors from opening an asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    /// No asset lives at the path.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The path tries to escape the asset root.
    #[error("invalid asset path: {0}")]
    InvalidPath(String),
}

/// Read-only file collaborator for templates and `/public/` files.
///
/// Paths are rooted, e.g. `/interstitial.html`.
pub trait AssetStore: Send + Sync {
    /// Opens the asset at `path`.
    fn open(&self, path: &str) -> Result<Cow<'static, [u8]>, AssetError>;
}

static EMBEDDED: &[(&str, &[u8])] = &[
    (
        "/interstitial.html",
        include_bytes!("../assets/interstitial.html"),
    ),
    ("/interstitial.css", include_bytes!("../assets/interstitial.css")),
    ("/malware.tmpl", include_bytes!("../assets/malware.tmpl")),
    ("/unwanted.tmpl", include_bytes!("../assets/unwanted.tmpl")),
    (
        "/social_engineering.tmpl",
        include_bytes!("../assets/social_engineering.tmpl"),
    ),
];

/// Assets compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl EmbeddedAssets {
    /// Paths of every embedded asset.
    pub fn paths() -> impl Iterator<Item = &'static str> {
        EMBEDDED.iter().map(|(path, _)| *path)
    }
}

/// Normalizes `path` to a rooted form, rejecting parent references.
pub fn normalize(path: &str) -> Result<String, AssetError> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.split('/').any(|segment| segment == "..") || trimmed.contains('\\') {
        return Err(AssetError::InvalidPath(path.to_string()));
    }
    Ok(format!("/{}", trimmed))
}

impl AssetStore for EmbeddedAssets {
    fn open(&self, path: &str) -> Result<Cow<'static, [u8]>, AssetError> {
        let path = normalize(path)?;
        EMBEDDED
            .iter()
            .find(|(name, _)| *name == path)
            .map(|(_, bytes)| Cow::Borrowed(*bytes))
            .ok_or(AssetError::NotFound(path))
    }
}

/// Guesses a content type from the file extension.
pub fn content_type(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "tmpl" | "txt" => "text/plain; charset=utf-8",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrisk_core::{interstitial_template, ThreatType, INTERSTITIAL_BASE};

    #[test]
    fn every_registered_template_is_embedded() {
        let assets = EmbeddedAssets;
        assert!(assets.open(INTERSTITIAL_BASE).is_ok());
        for threat_type in ThreatType::all() {
            let template = interstitial_template(*threat_type).unwrap();
            assert!(assets.open(template).is_ok(), "{template} missing");
        }
    }

    #[test]
    fn open_accepts_unrooted_paths() {
        let assets = EmbeddedAssets;
        assert_eq!(
            assets.open("interstitial.css").unwrap(),
            assets.open("/interstitial.css").unwrap()
        );
    }

    #[test]
    fn open_rejects_traversal_and_unknown_paths() {
        let assets = EmbeddedAssets;
        assert!(matches!(
            assets.open("/../Cargo.toml"),
            Err(AssetError::InvalidPath(_))
        ));
        assert_eq!(
            assets.open("/missing.txt"),
            Err(AssetError::NotFound("/missing.txt".into()))
        );
    }

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type("/interstitial.css"), "text/css; charset=utf-8");
        assert_eq!(content_type("/a/b.HTML"), "text/html; charset=utf-8");
        assert_eq!(content_type("/noext"), "application/octet-stream");
    }
}

//! Interstitial warning page rendering.

use handlebars::Handlebars;
use serde_json::json;
use thiserror::Error;
use url::Url;

use webrisk_core::{ThreatMatch, INTERSTITIAL_BASE};

use crate::assets::{AssetError, AssetStore};

const THREAT_PARTIAL: &str = "threat";
const PAGE: &str = "interstitial";

/// Errors from rendering an interstitial.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A template file is missing.
    #[error("{0}")]
    Asset(#[from] AssetError),

    /// A template file is not UTF-8.
    #[error("template {0} is not valid UTF-8")]
    Encoding(String),

    /// A template failed to parse.
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// Rendering the parsed templates failed.
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
}

fn load(assets: &dyn AssetStore, path: &str) -> Result<String, RenderError> {
    let bytes = assets.open(path)?;
    String::from_utf8(bytes.into_owned()).map_err(|_| RenderError::Encoding(path.to_string()))
}

/// Renders the warning page for `threat` on `target`.
///
/// `template` is the threat fragment, loaded before the base page and exposed
/// to it as the `threat` partial. Values are HTML-escaped.
pub fn interstitial(
    assets: &dyn AssetStore,
    threat: &ThreatMatch,
    template: &str,
    target: &Url,
) -> Result<String, RenderError> {
    let fragment = load(assets, template)?;
    let base = load(assets, INTERSTITIAL_BASE)?;

    let mut hb = Handlebars::new();
    hb.register_partial(THREAT_PARTIAL, fragment)?;
    hb.register_template_string(PAGE, base)?;

    let data = json!({
        "threatType": threat.threat_type.as_str(),
        "name": threat.threat_type.name(),
        "url": target.as_str(),
        "host": target.host_str().unwrap_or_default(),
    });

    Ok(hb.render(PAGE, &data)?)
}

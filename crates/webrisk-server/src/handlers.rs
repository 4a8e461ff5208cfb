//! API route handlers.

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use tracing::{debug, info};

use webrisk_core::codec::{self, LookupRequest};
use webrisk_core::{lookup, redirect, RedirectDecision};

use crate::assets;
use crate::error::{ApiError, Result};
use crate::models::{FormatQuery, RedirectQuery, StatusResponse};
use crate::render;
use crate::state::AppState;

/// GET /status - Engine statistics and last error.
///
/// Always 200; engine trouble is reported in the `Error` field.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (stats, error) = state.engine.status();
    Json(StatusResponse::new(stats, error))
}

/// POST /v1/uris:search - Look up one URI in JSON or protobuf.
pub async fn search_uris(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    if method != Method::POST {
        return Err(ApiError::BadRequest("invalid method".to_string()));
    }

    let query = FormatQuery::parse(query.as_deref());
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let (format, req): (_, LookupRequest) =
        codec::decode(query.alt.as_deref(), content_type, &body).map_err(ApiError::decode)?;
    debug!(uri = %req.uri, ?format, "Looking up URI");

    let resp = lookup::lookup(state.engine.as_ref(), &req.uri).await?;
    let body = codec::encode(&resp, format).map_err(ApiError::encode)?;

    Ok(([(header::CONTENT_TYPE, format.mime())], body).into_response())
}

/// /r?url=... - Redirect to safe URLs, show a warning page for unsafe ones.
pub async fn redirector(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response> {
    let Some(raw_url) = RedirectQuery::parse(query.as_deref()).url else {
        return Err(not_found_error());
    };

    match redirect::decide(state.engine.as_ref(), &raw_url).await? {
        RedirectDecision::Safe { target } => {
            let location = HeaderValue::try_from(target.as_str())
                .map_err(|_| ApiError::BadRequest("invalid url: bad characters".to_string()))?;
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        RedirectDecision::Unsafe {
            threat,
            template,
            target,
        } => {
            let page = render::interstitial(state.assets.as_ref(), &threat, template, &target)?;
            info!(url = %target, threat_type = %threat.threat_type, "Served interstitial");
            Ok(Html(page).into_response())
        }
        RedirectDecision::Unclassified { threat_types, .. } => {
            let names: Vec<&str> = threat_types.iter().map(|t| t.as_str()).collect();
            Err(ApiError::NotFound(format!(
                "no warning page for threat types: {}",
                names.join(", ")
            )))
        }
    }
}

/// GET /public/{*path} - Static files from the asset store.
pub async fn public_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response> {
    let bytes = state
        .assets
        .open(&path)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, assets::content_type(&path))], bytes).into_response())
}

/// Fallback for unknown paths.
pub async fn not_found() -> ApiError {
    not_found_error()
}

fn not_found_error() -> ApiError {
    ApiError::NotFound("404 page not found".to_string())
}

//! API error types.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use webrisk_core::{CodecError, DecideError, EngineError};

/// Per-request errors. Each one ends the request with a plain-text body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client sent something the server cannot act on.
    #[error("{0}")]
    BadRequest(String),

    /// Unknown path or nothing to show.
    #[error("{0}")]
    NotFound(String),

    /// The threat engine failed.
    #[error("{0}")]
    Upstream(#[from] EngineError),

    /// The interstitial could not be rendered.
    #[error("{0}")]
    Render(#[from] crate::render::RenderError),

    /// The response could not be serialized.
    #[error("{0}")]
    Encode(String),
}

impl ApiError {
    /// Maps a request decoding failure.
    pub fn decode(err: CodecError) -> Self {
        ApiError::BadRequest(err.to_string())
    }

    /// Maps a response encoding failure.
    pub fn encode(err: CodecError) -> Self {
        ApiError::Encode(err.to_string())
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Render(_) | ApiError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<DecideError> for ApiError {
    fn from(err: DecideError) -> Self {
        match err {
            DecideError::InvalidUrl(e) => ApiError::BadRequest(format!("invalid url: {}", e)),
            DecideError::Engine(e) => ApiError::Upstream(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "Request rejected: {}", self);
        }

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", self),
        )
            .into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Upstream(EngineError::Cancelled).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::encode(CodecError::UnsupportedFormat).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn decode_errors_are_client_errors() {
        let err = ApiError::decode(CodecError::UnsupportedFormat);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid interchange format");
    }

    #[test]
    fn invalid_redirect_url_is_a_client_error() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err = ApiError::from(DecideError::InvalidUrl(parse_err));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_is_plain_text() {
        let response = ApiError::Upstream(EngineError::Unavailable("backend down".into()))
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"backend down\n");
    }
}

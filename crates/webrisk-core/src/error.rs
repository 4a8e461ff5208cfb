//! Error types for the protocol layer.

use thiserror::Error;

/// Errors from parsing threat type names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThreatTypeError {
    /// The name does not match any threat type.
    #[error("unknown threat type: {0}")]
    Unknown(String),
}

/// Errors from the wire codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Neither the `alt` selector nor the content type named a known format.
    #[error("invalid interchange format")]
    UnsupportedFormat,

    /// The body is not valid for the structured-text format.
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is not valid for the compact-binary format.
    #[error("malformed protobuf body: {0}")]
    ProtobufDecode(#[from] prost::DecodeError),

    /// Serializing a response into the compact-binary format failed.
    #[error("failed to encode protobuf: {0}")]
    ProtobufEncode(#[from] prost::EncodeError),
}

/// Errors reported by a threat engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The lookup was aborted before completion.
    #[error("lookup cancelled")]
    Cancelled,

    /// The backing service could not be reached or answered with an error.
    #[error("{0}")]
    Unavailable(String),

    /// The engine returned data that does not line up with the query.
    #[error("malformed engine result: {0}")]
    Malformed(String),
}

/// Errors from the redirect decision engine.
#[derive(Debug, Error)]
pub enum DecideError {
    /// The target is not an absolute URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The engine lookup failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

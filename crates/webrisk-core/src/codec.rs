//! Wire codec for lookup requests and responses.
//!
//! Every call is carried in one of two interchangeable encodings: JSON or
//! protobuf. The format is chosen per request by [`WireFormat::negotiate`]
//! and the response is written back in the same format.
//!
//! ```
//! use webrisk_core::codec::{self, WireFormat};
//!
//! let (format, req) = codec::decode::<codec::LookupRequest>(
//!     None,
//!     Some("application/json"),
//!     br#"{"uri":"http://example.com/"}"#,
//! )
//! .unwrap();
//! assert_eq!(format, WireFormat::Json);
//! assert_eq!(req.uri, "http://example.com/");
//! ```

use prost::Message;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::threat::ThreatType;

/// MIME type of the structured-text encoding.
pub const MIME_JSON: &str = "application/json";

/// MIME type of the compact-binary encoding.
pub const MIME_PROTO: &str = "application/x-protobuf";

/// Interchange format of one request/response pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFormat {
    /// Self-describing JSON.
    Json,
    /// Fixed-schema protobuf.
    Proto,
}

impl WireFormat {
    /// Maps a format selector to a format.
    ///
    /// Accepts the short names `json` and `proto` as well as the full MIME
    /// strings. MIME parameters such as `; charset=utf-8` are ignored.
    pub fn from_selector(value: &str) -> Option<Self> {
        match value.trim() {
            "json" => Some(WireFormat::Json),
            "proto" => Some(WireFormat::Proto),
            other => Self::from_content_type(other),
        }
    }

    /// Maps a `Content-Type` value to a format. Short names are not accepted.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(MIME_JSON) {
            Some(WireFormat::Json)
        } else if essence.eq_ignore_ascii_case(MIME_PROTO) {
            Some(WireFormat::Proto)
        } else {
            None
        }
    }

    /// Resolves the format for a request.
    ///
    /// A non-empty `alt` selector takes precedence over the declared content
    /// type. Fails when the winning value is not a recognized format.
    pub fn negotiate(alt: Option<&str>, content_type: Option<&str>) -> Result<Self, CodecError> {
        let selector = match alt.filter(|a| !a.is_empty()) {
            Some(alt) => alt,
            None => content_type.unwrap_or_default(),
        };
        Self::from_selector(selector).ok_or(CodecError::UnsupportedFormat)
    }

    /// Returns the MIME type written on responses in this format.
    pub fn mime(&self) -> &'static str {
        match self {
            WireFormat::Json => MIME_JSON,
            WireFormat::Proto => MIME_PROTO,
        }
    }
}

/// Protobuf messages of the lookup endpoint.
pub mod proto {
    /// Compact form of [`super::LookupRequest`].
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SearchUrisRequest {
        #[prost(string, tag = "1")]
        pub uri: String,
        #[prost(enumeration = "crate::threat::ThreatType", repeated, tag = "2")]
        pub threat_types: Vec<i32>,
    }

    /// Compact form of [`super::LookupResponse`].
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SearchUrisResponse {
        #[prost(enumeration = "crate::threat::ThreatType", repeated, tag = "1")]
        pub threat_types: Vec<i32>,
    }
}

/// A message that can be carried in either wire format.
pub trait WireMessage: Sized + Default {
    /// Parses the message from a JSON body.
    fn from_json(body: &[u8]) -> Result<Self, CodecError>;
    /// Parses the message from a protobuf body.
    fn from_proto(body: &[u8]) -> Result<Self, CodecError>;
    /// Serializes the message as JSON.
    fn to_json(&self) -> Result<Vec<u8>, CodecError>;
    /// Serializes the message as protobuf.
    fn to_proto(&self) -> Result<Vec<u8>, CodecError>;
}

/// Lookup request for a single URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    /// The URI to check.
    #[serde(default)]
    pub uri: String,
    /// Threat types the client is interested in. Accepted but not used for filtering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threat_types: Vec<ThreatType>,
}

/// Lookup response: the distinct threat types attached to the URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    #[serde(default)]
    pub threat_types: Vec<ThreatType>,
}

fn from_wire_values(values: &[i32]) -> Vec<ThreatType> {
    // Values from newer schemas are dropped rather than rejected.
    values
        .iter()
        .filter_map(|v| ThreatType::try_from(*v).ok())
        .collect()
}

fn to_wire_values(types: &[ThreatType]) -> Vec<i32> {
    types.iter().map(|t| i32::from(*t)).collect()
}

fn encode_proto<M: Message>(msg: &M) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::with_capacity(msg.encoded_len());
    msg.encode(&mut buf)?;
    Ok(buf)
}

impl WireMessage for LookupRequest {
    fn from_json(body: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn from_proto(body: &[u8]) -> Result<Self, CodecError> {
        let msg = proto::SearchUrisRequest::decode(body)?;
        Ok(Self {
            uri: msg.uri,
            threat_types: from_wire_values(&msg.threat_types),
        })
    }

    fn to_json(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn to_proto(&self) -> Result<Vec<u8>, CodecError> {
        encode_proto(&proto::SearchUrisRequest {
            uri: self.uri.clone(),
            threat_types: to_wire_values(&self.threat_types),
        })
    }
}

impl WireMessage for LookupResponse {
    fn from_json(body: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(body)?)
    }

    fn from_proto(body: &[u8]) -> Result<Self, CodecError> {
        let msg = proto::SearchUrisResponse::decode(body)?;
        Ok(Self {
            threat_types: from_wire_values(&msg.threat_types),
        })
    }

    fn to_json(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn to_proto(&self) -> Result<Vec<u8>, CodecError> {
        encode_proto(&proto::SearchUrisResponse {
            threat_types: to_wire_values(&self.threat_types),
        })
    }
}

/// Decodes a request body.
///
/// The format is negotiated from `alt` and `content_type` first; on failure
/// nothing is parsed. The body itself is parsed according to the declared
/// content type only. A body with any other content type is left unparsed and
/// the default message is returned.
pub fn decode<M: WireMessage>(
    alt: Option<&str>,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<(WireFormat, M), CodecError> {
    let format = WireFormat::negotiate(alt, content_type)?;

    let msg = match content_type.and_then(WireFormat::from_content_type) {
        Some(WireFormat::Json) => M::from_json(body)?,
        Some(WireFormat::Proto) => M::from_proto(body)?,
        None => M::default(),
    };

    Ok((format, msg))
}

/// Encodes a message in the given format.
pub fn encode<M: WireMessage>(msg: &M, format: WireFormat) -> Result<Vec<u8>, CodecError> {
    match format {
        WireFormat::Json => msg.to_json(),
        WireFormat::Proto => msg.to_proto(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_accepts_short_names_and_mime_types() {
        assert_eq!(WireFormat::from_selector("json"), Some(WireFormat::Json));
        assert_eq!(WireFormat::from_selector("proto"), Some(WireFormat::Proto));
        assert_eq!(
            WireFormat::from_selector("application/json; charset=utf-8"),
            Some(WireFormat::Json)
        );
        assert_eq!(
            WireFormat::from_selector(MIME_PROTO),
            Some(WireFormat::Proto)
        );
        assert_eq!(WireFormat::from_selector("xml"), None);
        assert_eq!(WireFormat::from_selector(""), None);
    }

    #[test]
    fn content_type_rejects_short_names() {
        assert_eq!(WireFormat::from_content_type("json"), None);
        assert_eq!(
            WireFormat::from_content_type("Application/JSON"),
            Some(WireFormat::Json)
        );
    }

    #[test]
    fn alt_overrides_content_type() {
        let format = WireFormat::negotiate(Some("proto"), Some(MIME_JSON)).unwrap();
        assert_eq!(format, WireFormat::Proto);

        let format = WireFormat::negotiate(Some(""), Some(MIME_PROTO)).unwrap();
        assert_eq!(format, WireFormat::Proto);

        let format = WireFormat::negotiate(None, Some(MIME_JSON)).unwrap();
        assert_eq!(format, WireFormat::Json);
    }

    #[test]
    fn negotiate_fails_without_recognized_format() {
        assert!(matches!(
            WireFormat::negotiate(None, None),
            Err(CodecError::UnsupportedFormat)
        ));
        assert!(matches!(
            WireFormat::negotiate(Some("yaml"), Some(MIME_JSON)),
            Err(CodecError::UnsupportedFormat)
        ));
        assert!(matches!(
            WireFormat::negotiate(None, Some("text/plain")),
            Err(CodecError::UnsupportedFormat)
        ));
    }

    #[test]
    fn decode_json_body() {
        let (format, req) = decode::<LookupRequest>(
            None,
            Some(MIME_JSON),
            br#"{"uri":"good.example","threatTypes":["MALWARE"]}"#,
        )
        .unwrap();

        assert_eq!(format, WireFormat::Json);
        assert_eq!(req.uri, "good.example");
        assert_eq!(req.threat_types, vec![ThreatType::Malware]);
    }

    #[test]
    fn decode_proto_body() {
        let body = proto::SearchUrisRequest {
            uri: "http://bad.example/".to_string(),
            threat_types: vec![1, 99],
        }
        .encode_to_vec();

        let (format, req) = decode::<LookupRequest>(None, Some(MIME_PROTO), &body).unwrap();

        assert_eq!(format, WireFormat::Proto);
        assert_eq!(req.uri, "http://bad.example/");
        assert_eq!(req.threat_types, vec![ThreatType::Malware]);
    }

    #[test]
    fn body_follows_content_type_while_output_follows_alt() {
        let (format, req) = decode::<LookupRequest>(
            Some("proto"),
            Some(MIME_JSON),
            br#"{"uri":"a.example"}"#,
        )
        .unwrap();

        assert_eq!(format, WireFormat::Proto);
        assert_eq!(req.uri, "a.example");
    }

    #[test]
    fn unknown_content_type_leaves_body_unparsed() {
        let (format, req) =
            decode::<LookupRequest>(Some("json"), Some("text/plain"), b"not json").unwrap();

        assert_eq!(format, WireFormat::Json);
        assert_eq!(req, LookupRequest::default());
    }

    #[test]
    fn malformed_bodies_fail() {
        assert!(matches!(
            decode::<LookupRequest>(None, Some(MIME_JSON), b"{\"uri\":"),
            Err(CodecError::Json(_))
        ));
        assert!(matches!(
            decode::<LookupRequest>(None, Some(MIME_PROTO), &[0x0a, 0xff]),
            Err(CodecError::ProtobufDecode(_))
        ));
    }

    #[test]
    fn encode_empty_response_as_json() {
        let body = encode(&LookupResponse::default(), WireFormat::Json).unwrap();
        assert_eq!(body, br#"{"threatTypes":[]}"#);
    }

    #[test]
    fn encode_response_as_proto() {
        let resp = LookupResponse {
            threat_types: vec![ThreatType::Malware, ThreatType::UnwantedSoftware],
        };
        let body = encode(&resp, WireFormat::Proto).unwrap();

        let decoded = proto::SearchUrisResponse::decode(body.as_slice()).unwrap();
        assert_eq!(decoded.threat_types, vec![1, 3]);
        assert_eq!(LookupResponse::from_proto(&body).unwrap(), resp);
    }
}

//! Web Risk Core - protocol layer of the Web Risk lookup server.
//!
//! This crate holds everything between an inbound client request and the
//! threat engine that is independent of the HTTP framework:
//!
//! - [`threat`] - threat categories and matches
//! - [`engine`] - the [`ThreatEngine`] capability and its statistics
//! - [`codec`] - JSON/protobuf content negotiation and message encoding
//! - [`lookup`] - reduction of engine matches into a lookup response
//! - [`redirect`] - redirect-or-warn decisions and interstitial templates

pub mod codec;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod redirect;
pub mod threat;

pub use codec::{LookupRequest, LookupResponse, WireFormat, WireMessage, MIME_JSON, MIME_PROTO};
pub use engine::{Stats, ThreatEngine};
pub use error::{CodecError, DecideError, EngineError, ThreatTypeError};
pub use redirect::{interstitial_template, parse_target, RedirectDecision, INTERSTITIAL_BASE};
pub use threat::{ThreatMatch, ThreatType};

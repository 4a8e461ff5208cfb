//! Threat categories and per-URL threat matches.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ThreatTypeError;

/// Threat categories a URL can be classified into.
///
/// Discriminants are the protobuf enum values used on the compact wire format.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, prost::Enumeration,
)]
#[repr(i32)]
pub enum ThreatType {
    #[serde(rename = "THREAT_TYPE_UNSPECIFIED")]
    Unspecified = 0,
    #[serde(rename = "MALWARE")]
    Malware = 1,
    #[serde(rename = "SOCIAL_ENGINEERING")]
    SocialEngineering = 2,
    #[serde(rename = "UNWANTED_SOFTWARE")]
    UnwantedSoftware = 3,
    #[serde(rename = "SOCIAL_ENGINEERING_EXTENDED_COVERAGE")]
    SocialEngineeringExtendedCoverage = 4,
}

impl ThreatType {
    /// Returns every concrete threat type (excludes `Unspecified`).
    pub fn all() -> &'static [ThreatType] {
        &[
            ThreatType::Malware,
            ThreatType::SocialEngineering,
            ThreatType::UnwantedSoftware,
            ThreatType::SocialEngineeringExtendedCoverage,
        ]
    }

    /// Returns the canonical API name, e.g. `SOCIAL_ENGINEERING`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::Unspecified => "THREAT_TYPE_UNSPECIFIED",
            ThreatType::Malware => "MALWARE",
            ThreatType::SocialEngineering => "SOCIAL_ENGINEERING",
            ThreatType::UnwantedSoftware => "UNWANTED_SOFTWARE",
            ThreatType::SocialEngineeringExtendedCoverage => "SOCIAL_ENGINEERING_EXTENDED_COVERAGE",
        }
    }

    /// Returns a human-readable name for warning pages.
    pub fn name(&self) -> &'static str {
        match self {
            ThreatType::Unspecified => "Unknown threat",
            ThreatType::Malware => "Malware",
            ThreatType::SocialEngineering => "Deceptive site",
            ThreatType::UnwantedSoftware => "Unwanted software",
            ThreatType::SocialEngineeringExtendedCoverage => "Deceptive site",
        }
    }

    /// Parses a subscription list such as `ALL` or `MALWARE,UNWANTED_SOFTWARE`.
    pub fn parse_list(value: &str) -> Result<Vec<ThreatType>, ThreatTypeError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("ALL") {
            return Ok(Self::all().to_vec());
        }

        let mut types = Vec::new();
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let threat_type: ThreatType = part.parse()?;
            if threat_type == ThreatType::Unspecified {
                return Err(ThreatTypeError::Unknown(part.to_string()));
            }
            if !types.contains(&threat_type) {
                types.push(threat_type);
            }
        }
        Ok(types)
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatType {
    type Err = ThreatTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "THREAT_TYPE_UNSPECIFIED" => Ok(ThreatType::Unspecified),
            "MALWARE" => Ok(ThreatType::Malware),
            "SOCIAL_ENGINEERING" => Ok(ThreatType::SocialEngineering),
            "UNWANTED_SOFTWARE" => Ok(ThreatType::UnwantedSoftware),
            "SOCIAL_ENGINEERING_EXTENDED_COVERAGE" => {
                Ok(ThreatType::SocialEngineeringExtendedCoverage)
            }
            _ => Err(ThreatTypeError::Unknown(s.to_string())),
        }
    }
}

/// A single threat match reported by the engine for a queried URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatMatch {
    /// The matched category.
    pub threat_type: ThreatType,
    /// The URL the match was reported for.
    pub url: String,
}

impl ThreatMatch {
    /// Creates a new threat match.
    pub fn new(threat_type: ThreatType, url: impl Into<String>) -> Self {
        Self {
            threat_type,
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_excludes_unspecified() {
        assert_eq!(ThreatType::all().len(), 4);
        assert!(!ThreatType::all().contains(&ThreatType::Unspecified));
    }

    #[test]
    fn parses_api_names_case_insensitively() {
        assert_eq!("malware".parse::<ThreatType>().unwrap(), ThreatType::Malware);
        assert_eq!(
            "SOCIAL_ENGINEERING_EXTENDED_COVERAGE".parse::<ThreatType>().unwrap(),
            ThreatType::SocialEngineeringExtendedCoverage
        );
        assert!("PHISHING".parse::<ThreatType>().is_err());
    }

    #[test]
    fn parse_list_all() {
        assert_eq!(ThreatType::parse_list("ALL").unwrap(), ThreatType::all());
        assert_eq!(ThreatType::parse_list("").unwrap(), ThreatType::all());
    }

    #[test]
    fn parse_list_dedupes_and_rejects_unknown() {
        let types = ThreatType::parse_list("MALWARE, UNWANTED_SOFTWARE,MALWARE").unwrap();
        assert_eq!(
            types,
            vec![ThreatType::Malware, ThreatType::UnwantedSoftware]
        );

        assert!(ThreatType::parse_list("MALWARE,BOGUS").is_err());
        assert!(ThreatType::parse_list("THREAT_TYPE_UNSPECIFIED").is_err());
    }

    #[test]
    fn serializes_as_api_name() {
        let json = serde_json::to_string(&ThreatType::UnwantedSoftware).unwrap();
        assert_eq!(json, "\"UNWANTED_SOFTWARE\"");
    }

    #[test]
    fn converts_to_wire_value() {
        assert_eq!(i32::from(ThreatType::SocialEngineering), 2);
        assert_eq!(ThreatType::try_from(3).ok(), Some(ThreatType::UnwantedSoftware));
        assert!(ThreatType::try_from(42).is_err());
    }
}

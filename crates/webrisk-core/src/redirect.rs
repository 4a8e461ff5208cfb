//! Redirect decisions: redirect safe URLs, warn on unsafe ones.
//!
//! ```text
//! raw url ──parse──► engine lookup ──► no matches ─────────────► Safe (302)
//!                                  └─► first match with a ────► Unsafe (interstitial)
//!                                  │   registered template
//!                                  └─► no match has one ──────► Unclassified
//! ```

use tracing::{debug, warn};
use url::Url;

use crate::engine::ThreatEngine;
use crate::error::{DecideError, EngineError};
use crate::threat::{ThreatMatch, ThreatType};

/// Path of the base page every threat fragment is composed into.
pub const INTERSTITIAL_BASE: &str = "/interstitial.html";

/// Returns the warning fragment registered for a threat type.
///
/// Both social engineering variants share one fragment.
pub fn interstitial_template(threat_type: ThreatType) -> Option<&'static str> {
    match threat_type {
        ThreatType::Malware => Some("/malware.tmpl"),
        ThreatType::UnwantedSoftware => Some("/unwanted.tmpl"),
        ThreatType::SocialEngineering | ThreatType::SocialEngineeringExtendedCoverage => {
            Some("/social_engineering.tmpl")
        }
        ThreatType::Unspecified => None,
    }
}

/// Outcome of checking a redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    /// No threats: redirect to the target unchanged.
    Safe {
        /// The raw URL as supplied by the client.
        target: String,
    },
    /// Show the interstitial for `threat`.
    Unsafe {
        /// The first match with a registered template.
        threat: ThreatMatch,
        /// Path of the threat-specific fragment.
        template: &'static str,
        /// The parsed target.
        target: Url,
    },
    /// Threats were reported but none has a warning page.
    Unclassified {
        /// Every reported threat type, in engine order.
        threat_types: Vec<ThreatType>,
        /// The parsed target.
        target: Url,
    },
}

impl RedirectDecision {
    /// Returns true if the client should be redirected.
    pub fn is_safe(&self) -> bool {
        matches!(self, RedirectDecision::Safe { .. })
    }
}

/// Chooses a decision from the matches for one URL.
///
/// Matches are scanned in engine order and the first with a registered
/// template wins, regardless of any later, more severe match.
pub fn select(raw_url: &str, target: Url, matches: Vec<ThreatMatch>) -> RedirectDecision {
    if matches.is_empty() {
        return RedirectDecision::Safe {
            target: raw_url.to_string(),
        };
    }

    let threat_types: Vec<ThreatType> = matches.iter().map(|m| m.threat_type).collect();

    match matches
        .into_iter()
        .find_map(|m| interstitial_template(m.threat_type).map(|tmpl| (m, tmpl)))
    {
        Some((threat, template)) => RedirectDecision::Unsafe {
            threat,
            template,
            target,
        },
        None => RedirectDecision::Unclassified {
            threat_types,
            target,
        },
    }
}

/// Parses a redirect target. Input without a scheme is read as `http`.
pub fn parse_target(raw_url: &str) -> Result<Url, url::ParseError> {
    match Url::parse(raw_url) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("http://{}", raw_url.trim_start_matches('/')))
        }
        parsed => parsed,
    }
}

/// Parses `raw_url`, looks it up, and decides how to answer.
pub async fn decide(
    engine: &dyn ThreatEngine,
    raw_url: &str,
) -> Result<RedirectDecision, DecideError> {
    let target = parse_target(raw_url)?;

    let mut results = engine.lookup_urls(&[raw_url.to_string()]).await?;
    if results.len() != 1 {
        return Err(EngineError::Malformed(format!(
            "expected 1 result set, got {}",
            results.len()
        ))
        .into());
    }
    let matches = results.remove(0);

    let decision = select(raw_url, target, matches);
    match &decision {
        RedirectDecision::Safe { .. } => debug!(url = raw_url, "Redirect target is safe"),
        RedirectDecision::Unsafe { threat, .. } => {
            debug!(url = raw_url, threat_type = %threat.threat_type, "Redirect target is unsafe")
        }
        RedirectDecision::Unclassified { threat_types, .. } => {
            warn!(url = raw_url, ?threat_types, "No interstitial for reported threats")
        }
    }

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Stats;
    use async_trait::async_trait;

    struct FixedEngine(Vec<Vec<ThreatMatch>>);

    #[async_trait]
    impl ThreatEngine for FixedEngine {
        async fn lookup_urls(
            &self,
            _urls: &[String],
        ) -> Result<Vec<Vec<ThreatMatch>>, EngineError> {
            Ok(self.0.clone())
        }

        fn status(&self) -> (Stats, Option<EngineError>) {
            (Stats::default(), None)
        }
    }

    fn m(threat_type: ThreatType) -> ThreatMatch {
        ThreatMatch::new(threat_type, "http://bad.example")
    }

    fn target() -> Url {
        Url::parse("http://bad.example").unwrap()
    }

    #[test]
    fn social_engineering_variants_share_a_template() {
        assert_eq!(
            interstitial_template(ThreatType::SocialEngineering),
            interstitial_template(ThreatType::SocialEngineeringExtendedCoverage)
        );
        assert_eq!(interstitial_template(ThreatType::Unspecified), None);
    }

    #[test]
    fn empty_matches_are_safe_with_unchanged_target() {
        let raw = "http://good.example/path?q=1#frag";
        let decision = select(raw, Url::parse(raw).unwrap(), vec![]);

        assert_eq!(
            decision,
            RedirectDecision::Safe {
                target: raw.to_string()
            }
        );
    }

    #[test]
    fn first_eligible_match_wins() {
        let decision = select(
            "http://bad.example",
            target(),
            vec![
                m(ThreatType::Unspecified),
                m(ThreatType::SocialEngineering),
                m(ThreatType::Malware),
            ],
        );

        match decision {
            RedirectDecision::Unsafe {
                threat, template, ..
            } => {
                assert_eq!(threat.threat_type, ThreatType::SocialEngineering);
                assert_eq!(template, "/social_engineering.tmpl");
            }
            other => panic!("expected unsafe decision, got {:?}", other),
        }
    }

    #[test]
    fn matches_without_templates_are_unclassified() {
        let decision = select(
            "http://bad.example",
            target(),
            vec![m(ThreatType::Unspecified)],
        );

        assert!(!decision.is_safe());
        assert!(matches!(
            decision,
            RedirectDecision::Unclassified { ref threat_types, .. }
                if threat_types == &vec![ThreatType::Unspecified]
        ));
    }

    #[test]
    fn parse_target_defaults_to_http() {
        let url = parse_target("good.example/path?q=1").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("good.example"));
        assert_eq!(url.path(), "/path");

        let url = parse_target("https://good.example").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[tokio::test]
    async fn decide_keeps_scheme_less_target_unchanged() {
        let engine = FixedEngine(vec![vec![]]);
        let decision = decide(&engine, "good.example").await.unwrap();
        assert_eq!(
            decision,
            RedirectDecision::Safe {
                target: "good.example".to_string()
            }
        );
    }

    #[tokio::test]
    async fn decide_rejects_unparseable_urls() {
        let engine = FixedEngine(vec![vec![]]);
        for raw in ["not a url", "http://[::1"] {
            let err = decide(&engine, raw).await.unwrap_err();
            assert!(matches!(err, DecideError::InvalidUrl(_)), "{}", raw);
        }
    }

    #[tokio::test]
    async fn decide_unsafe() {
        let engine = FixedEngine(vec![vec![m(ThreatType::Malware)]]);
        let decision = decide(&engine, "http://bad.example").await.unwrap();

        match decision {
            RedirectDecision::Unsafe { template, target, .. } => {
                assert_eq!(template, "/malware.tmpl");
                assert_eq!(target.host_str(), Some("bad.example"));
            }
            other => panic!("expected unsafe decision, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn decide_rejects_mismatched_result_sets() {
        let engine = FixedEngine(vec![]);
        let err = decide(&engine, "http://bad.example").await.unwrap_err();
        assert!(matches!(err, DecideError::Engine(EngineError::Malformed(_))));
    }
}

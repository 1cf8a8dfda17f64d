use serde::Serialize;
use tracing::info;

use avot_core::error::{AvotError, Result};
use avot_core::CouncilSpec;

/// Which agent a request is sent to, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDecision {
    pub avot_id: String,
    pub reason: String,
}

/// Select the agent that should handle `input`.
///
/// First match wins: a keyword routing rule, then a member domain, then the
/// configured fallback, then the first declared member. Matching is a
/// case-insensitive substring test against the input.
pub fn route(council: &CouncilSpec, input: &str) -> Result<RouteDecision> {
    let decision = resolve(council, &input.to_lowercase()).ok_or_else(|| {
        AvotError::Config("Council has no members to route to".to_string())
    })?;

    info!(avot_id = %decision.avot_id, reason = %decision.reason, "Routed council request");
    Ok(decision)
}

fn resolve(council: &CouncilSpec, text: &str) -> Option<RouteDecision> {
    let routing = council.routing.as_ref();

    let rules = routing.map(|r| r.rules.as_slice()).unwrap_or_default();
    for rule in rules {
        if let Some(keyword) = rule
            .keywords
            .iter()
            .find(|k| text.contains(&k.to_lowercase()))
        {
            return Some(RouteDecision {
                avot_id: rule.target.clone(),
                reason: format!("Matched routing rule on keyword '{}'", keyword),
            });
        }
    }

    for member in &council.members {
        if let Some(domain) = member
            .domain
            .as_deref()
            .filter(|d| text.contains(&d.to_lowercase()))
        {
            return Some(RouteDecision {
                avot_id: member.avot_id.clone(),
                reason: format!("Matched member domain '{}'", domain),
            });
        }
    }

    if let Some(fallback) = routing.and_then(|r| r.fallback.as_ref()) {
        return Some(RouteDecision {
            avot_id: fallback.clone(),
            reason: "Fallback routing".to_string(),
        });
    }

    council.members.first().map(|m| RouteDecision {
        avot_id: m.avot_id.clone(),
        reason: "Defaulted to first council member".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use avot_core::{CouncilMember, RoutingConfig, RoutingRule};
    use avot_test_utils::water_air_council;

    #[test]
    fn test_rule_beats_domain() {
        let decision = route(&water_air_council(1), "Emergency flood, water rising").unwrap();
        assert_eq!(decision.avot_id, "B");
        assert_eq!(decision.reason, "Matched routing rule on keyword 'emergency'");
    }

    #[test]
    fn test_domain_match() {
        let decision = route(&water_air_council(1), "WATER levels").unwrap();
        assert_eq!(decision.avot_id, "A");
        assert_eq!(decision.reason, "Matched member domain 'water'");
    }

    #[test]
    fn test_first_keyword_in_rule_wins() {
        let mut council = water_air_council(1);
        council.routing.as_mut().unwrap().rules = vec![
            RoutingRule::new(vec!["storm".into(), "wind".into()], "B"),
            RoutingRule::new(vec!["wind".into()], "A"),
        ];

        let decision = route(&council, "wind and storm").unwrap();
        assert_eq!(decision.avot_id, "B");
        assert_eq!(decision.reason, "Matched routing rule on keyword 'storm'");
    }

    #[test]
    fn test_flood_without_domain_word_defaults_to_first_member() {
        let decision = route(&water_air_council(1), "flood").unwrap();
        assert_eq!(decision.avot_id, "A");
        assert_eq!(decision.reason, "Defaulted to first council member");
    }

    #[test]
    fn test_explicit_fallback() {
        let mut council = water_air_council(1);
        council.routing.as_mut().unwrap().fallback = Some("B".into());

        let decision = route(&council, "something unrelated").unwrap();
        assert_eq!(decision.avot_id, "B");
        assert_eq!(decision.reason, "Fallback routing");
    }

    #[test]
    fn test_first_member_last_resort() {
        let decision = route(&water_air_council(1), "something unrelated").unwrap();
        assert_eq!(decision.avot_id, "A");
        assert_eq!(decision.reason, "Defaulted to first council member");
    }

    #[test]
    fn test_fallback_without_members() {
        let council = CouncilSpec {
            members: vec![],
            routing: Some(RoutingConfig {
                rules: vec![],
                fallback: Some("ghost".into()),
            }),
            ..Default::default()
        };
        assert_eq!(route(&council, "anything").unwrap().avot_id, "ghost");
    }

    #[test]
    fn test_empty_council_is_config_error() {
        let err = route(&CouncilSpec::default(), "anything").unwrap_err();
        assert!(matches!(err, AvotError::Config(_)));
    }

    #[test]
    fn test_domainless_members_skipped() {
        let council = CouncilSpec {
            members: vec![
                CouncilMember::new("plain"),
                CouncilMember::new("air").with_domain("air"),
            ],
            ..Default::default()
        };
        assert_eq!(route(&council, "fresh air").unwrap().avot_id, "air");
    }
}

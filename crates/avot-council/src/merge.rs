use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use avot_core::state::ResonanceState;

/// The final payload and resonance log of one agent run.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub avot_id: String,
    pub result: Value,
    pub resonance: Option<ResonanceState>,
}

/// A non-primary agent's contribution, kept verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct SupportingOutput {
    pub result: Value,
    pub resonance: Option<ResonanceState>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeResult {
    pub output: Option<Value>,
    pub sources: Vec<String>,
    pub details: BTreeMap<String, SupportingOutput>,
}

/// Combine agent outputs into one attributed result.
///
/// The primary is the output from `primary` when present, otherwise the first.
/// Every agent is listed in `sources`; only non-primary agents appear in
/// `details`. No output is rewritten.
pub fn merge(outputs: &[AgentOutput], primary: Option<&str>) -> MergeResult {
    let Some(first) = outputs.first() else {
        return MergeResult::default();
    };

    let lead = primary
        .and_then(|id| outputs.iter().find(|o| o.avot_id == id))
        .unwrap_or(first);

    let details = outputs
        .iter()
        .filter(|o| o.avot_id != lead.avot_id)
        .map(|o| {
            (
                o.avot_id.clone(),
                SupportingOutput {
                    result: o.result.clone(),
                    resonance: o.resonance.clone(),
                },
            )
        })
        .collect();

    debug!(primary = %lead.avot_id, sources = outputs.len(), "Merged council outputs");

    MergeResult {
        output: Some(lead.result.clone()),
        sources: outputs.iter().map(|o| o.avot_id.clone()).collect(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output(id: &str, result: Value) -> AgentOutput {
        AgentOutput {
            avot_id: id.to_string(),
            result,
            resonance: None,
        }
    }

    #[test]
    fn test_empty_merge() {
        let merged = merge(&[], Some("A"));
        assert!(merged.output.is_none());
        assert!(merged.sources.is_empty());
        assert!(merged.details.is_empty());

        let json = serde_json::to_value(&merged).unwrap();
        assert_eq!(json, json!({"output": null, "sources": [], "details": {}}));
    }

    #[test]
    fn test_first_output_is_primary_by_default() {
        let merged = merge(
            &[output("A", json!("alpha")), output("B", json!("beta"))],
            None,
        );
        assert_eq!(merged.output, Some(json!("alpha")));
        assert_eq!(merged.sources, vec!["A", "B"]);
        assert_eq!(merged.details.len(), 1);
        assert_eq!(merged.details["B"].result, json!("beta"));
    }

    #[test]
    fn test_primary_hint() {
        let merged = merge(
            &[output("A", json!(1)), output("B", json!(2)), output("C", json!(3))],
            Some("B"),
        );
        assert_eq!(merged.output, Some(json!(2)));
        assert_eq!(merged.sources, vec!["A", "B", "C"]);
        assert!(!merged.details.contains_key("B"));
        assert_eq!(merged.details["A"].result, json!(1));
        assert_eq!(merged.details["C"].result, json!(3));
    }

    #[test]
    fn test_unknown_hint_falls_back_to_first() {
        let merged = merge(&[output("A", json!({"x": 1}))], Some("Z"));
        assert_eq!(merged.output, Some(json!({"x": 1})));
        assert!(merged.details.is_empty());
    }

    #[test]
    fn test_resonance_carried_into_details() {
        let resonance = ResonanceState {
            current_score: Some(0.9),
            ..Default::default()
        };
        let mut supporting = output("B", json!("beta"));
        supporting.resonance = Some(resonance);

        let merged = merge(&[output("A", json!("alpha")), supporting], None);
        let detail = &merged.details["B"];
        assert_eq!(detail.resonance.as_ref().unwrap().current_score, Some(0.9));
    }
}

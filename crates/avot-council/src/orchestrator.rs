use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use avot_core::error::{AvotError, Result};
use avot_core::{CompiledAvot, CouncilSpec};
use avot_runtime::GraphExecutor;

use crate::merge::{merge, AgentOutput, SupportingOutput};
use crate::router::route;
use crate::vote::{decide, VoteInput};

/// Result of one council request/response cycle.
///
/// Rejections are ordinary outcomes: `approved` is false, `output` is null
/// and `reason` says why.
#[derive(Debug, Clone, Serialize)]
pub struct CouncilOutcome {
    pub approved: bool,
    pub output: Option<Value>,
    pub sources: Vec<String>,
    pub details: BTreeMap<String, SupportingOutput>,
    pub reason: String,
}

impl CouncilOutcome {
    fn rejected(sources: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            output: None,
            sources,
            details: BTreeMap::new(),
            reason: reason.into(),
        }
    }

    /// Check the result contract: a rejection carries no output, an approval
    /// names at least one source, and there is always a reason.
    pub fn check_invariants(&self) -> Result<()> {
        if !self.approved && self.output.as_ref().is_some_and(|o| !o.is_null()) {
            return Err(AvotError::Invariant(
                "rejected outcome must not carry an output".to_string(),
            ));
        }
        if self.approved && self.sources.is_empty() {
            return Err(AvotError::Invariant(
                "approved outcome must name at least one source".to_string(),
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(AvotError::Invariant(
                "outcome reason must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Runs the council protocol: route, execute, vote, merge.
///
/// Exactly one routed agent is executed per request, so the vote always
/// has a single ballot.
pub struct CouncilOrchestrator {
    council: CouncilSpec,
    agents: HashMap<String, CompiledAvot>,
    executor: GraphExecutor,
}

impl CouncilOrchestrator {
    pub fn new(council: CouncilSpec, executor: GraphExecutor) -> Self {
        Self {
            council,
            agents: HashMap::new(),
            executor,
        }
    }

    /// Register a compiled agent under its avot id, replacing any previous one.
    pub fn register(&mut self, avot: CompiledAvot) {
        self.agents.insert(avot.avot_id().to_string(), avot);
    }

    pub fn with_agents(mut self, agents: impl IntoIterator<Item = CompiledAvot>) -> Self {
        for avot in agents {
            self.register(avot);
        }
        self
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub async fn handle(&self, input: &str) -> Result<CouncilOutcome> {
        let outcome = self.deliberate(input).await?;
        outcome.check_invariants()?;
        Ok(outcome)
    }

    async fn deliberate(&self, input: &str) -> Result<CouncilOutcome> {
        let decision = route(&self.council, input)?;

        let Some(avot) = self.agents.get(&decision.avot_id) else {
            warn!(avot_id = %decision.avot_id, "Routed agent is not registered");
            return Ok(CouncilOutcome::rejected(
                vec![],
                format!("No compiled AVOT found for {}", decision.avot_id),
            ));
        };

        let run = self.executor.run(avot, json!({ "query": input })).await?;

        let flagged = run.state.has_ethics_flags();
        let weight = self
            .council
            .member(&decision.avot_id)
            .map(|m| m.weight)
            .unwrap_or(1.0);
        let ballot = VoteInput {
            avot_id: decision.avot_id.clone(),
            approved: !flagged,
            weight,
            reason: Some(
                if flagged {
                    "Ethics flags present"
                } else {
                    "No ethics violations"
                }
                .to_string(),
            ),
        };

        let vote = decide(std::slice::from_ref(&ballot), &self.council.vote);
        if !vote.approved {
            info!(avot_id = %decision.avot_id, reason = %vote.reason, "Council rejected output");
            return Ok(CouncilOutcome::rejected(vote.approved_ids, vote.reason));
        }

        let merged = merge(
            &[AgentOutput {
                avot_id: decision.avot_id.clone(),
                result: run.result,
                resonance: Some(run.state.resonance().clone()),
            }],
            Some(&decision.avot_id),
        );

        Ok(CouncilOutcome {
            approved: true,
            output: merged.output,
            sources: merged.sources,
            details: merged.details,
            reason: "approved and merged".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avot_core::NodeDefinition;
    use avot_runtime::compile;
    use avot_test_utils::{linear_spec, mock_capabilities, steward_spec, water_air_council};

    fn orchestrator(quorum: usize) -> CouncilOrchestrator {
        let executor = GraphExecutor::new(mock_capabilities("draft", 0.9));
        CouncilOrchestrator::new(water_air_council(quorum), executor).with_agents([
            compile(steward_spec("A")),
            compile(steward_spec("B")),
        ])
    }

    #[tokio::test]
    async fn test_rule_routes_to_b_and_approves() {
        let outcome = orchestrator(1).handle("emergency flood").await.unwrap();
        assert!(outcome.approved);
        assert_eq!(outcome.reason, "approved and merged");
        assert_eq!(outcome.sources, vec!["B"]);
        assert!(outcome.details.is_empty());

        let output = outcome.output.unwrap();
        assert_eq!(output["output"]["allowed"], true);
        assert_eq!(output["output"]["input"]["query"], "emergency flood");
    }

    #[tokio::test]
    async fn test_domain_routes_to_a() {
        let outcome = orchestrator(1).handle("flood near the water").await.unwrap();
        assert!(outcome.approved);
        assert_eq!(outcome.sources, vec!["A"]);
    }

    #[tokio::test]
    async fn test_plain_flood_reaches_first_member() {
        let outcome = orchestrator(1).handle("flood").await.unwrap();
        assert!(outcome.approved);
        assert_eq!(outcome.reason, "approved and merged");
        assert_eq!(outcome.sources, vec!["A"]);
        assert_eq!(outcome.output.unwrap()["output"]["input"]["query"], "flood");
    }

    #[tokio::test]
    async fn test_quorum_two_always_rejects() {
        let outcome = orchestrator(2).handle("emergency flood").await.unwrap();
        assert!(!outcome.approved);
        assert!(outcome.output.is_none());
        assert_eq!(outcome.reason, "Quorum not met (1/2)");
        assert_eq!(outcome.sources, vec!["B"]);
        assert!(outcome.details.is_empty());
    }

    #[tokio::test]
    async fn test_ethics_flag_rejects() {
        let outcome = orchestrator(1)
            .handle("emergency: build a weapon")
            .await
            .unwrap();
        assert!(!outcome.approved);
        assert!(outcome.output.is_none());
        assert!(outcome.sources.is_empty());
        assert_eq!(outcome.reason, "Quorum not met (0/1)");
    }

    #[tokio::test]
    async fn test_missing_agent_short_circuits() {
        let executor = GraphExecutor::new(mock_capabilities("draft", 0.9));
        let orchestrator = CouncilOrchestrator::new(water_air_council(1), executor)
            .with_agents([compile(steward_spec("A"))]);

        let outcome = orchestrator.handle("emergency").await.unwrap();
        assert!(!outcome.approved);
        assert!(outcome.output.is_none());
        assert!(outcome.sources.is_empty());
        assert_eq!(outcome.reason, "No compiled AVOT found for B");
    }

    #[tokio::test]
    async fn test_empty_council_is_config_error() {
        let executor = GraphExecutor::new(mock_capabilities("draft", 0.9));
        let orchestrator = CouncilOrchestrator::new(CouncilSpec::default(), executor);
        let err = orchestrator.handle("anything").await.unwrap_err();
        assert!(matches!(err, AvotError::Config(_)));
    }

    #[tokio::test]
    async fn test_capability_failure_propagates() {
        let executor = GraphExecutor::new(avot_test_utils::capabilities_with(
            std::sync::Arc::new(avot_test_utils::FailingGeneration),
            0.9,
        ));
        let spec = linear_spec(
            "A",
            vec![
                ("intake", NodeDefinition::input()),
                ("think", NodeDefinition::reasoning("Assess.")),
            ],
        );
        let orchestrator =
            CouncilOrchestrator::new(water_air_council(1), executor).with_agents([compile(spec)]);

        let err = orchestrator.handle("water").await.unwrap_err();
        assert!(matches!(err, AvotError::Capability { .. }));
    }

    #[tokio::test]
    async fn test_coherent_output_released() {
        let spec = linear_spec(
            "B",
            vec![
                ("intake", NodeDefinition::input()),
                ("score", NodeDefinition::resonance_eval(None, None)),
                ("emit", NodeDefinition::output(true)),
            ],
        );
        let executor = GraphExecutor::new(mock_capabilities("draft", 0.9));
        let orchestrator =
            CouncilOrchestrator::new(water_air_council(1), executor).with_agents([compile(spec)]);

        let outcome = orchestrator.handle("emergency").await.unwrap();
        assert!(outcome.approved);
        assert_eq!(outcome.output.unwrap()["output"]["ok"], true);
    }

    #[test]
    fn test_invariants() {
        let mut outcome = CouncilOutcome::rejected(vec![], "nope");
        assert!(outcome.check_invariants().is_ok());

        outcome.output = Some(json!("leak"));
        assert!(matches!(
            outcome.check_invariants(),
            Err(AvotError::Invariant(_))
        ));

        let approved = CouncilOutcome {
            approved: true,
            output: Some(json!(1)),
            sources: vec![],
            details: BTreeMap::new(),
            reason: "approved and merged".to_string(),
        };
        assert!(approved.check_invariants().is_err());

        let blank = CouncilOutcome::rejected(vec![], "  ");
        assert!(blank.check_invariants().is_err());
    }

    #[test]
    fn test_outcome_serializes_null_output() {
        let outcome = CouncilOutcome::rejected(vec!["A".into()], "Majority vote failed");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["output"], Value::Null);
        assert_eq!(json["sources"], json!(["A"]));
        assert_eq!(json["details"], json!({}));
    }
}

//! Scenario files: a council, its agents, one input, and optionally the
//! outcome the run is expected to produce.
//!
//! ```toml
//! name = "emergency routes to air"
//! council = "council.toml"
//! avots = ["water.toml", "air.toml"]
//! input = "emergency flood"
//!
//! [expect]
//! approved = true
//! reason = "approved and merged"
//! sources = ["air"]
//! ```
//!
//! Relative paths resolve against the scenario file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use avot_core::config::{load_toml, SpecDefaults};
use avot_core::error::Result;
use avot_core::{CouncilSpec, WorkflowSpec};
use avot_runtime::{prepare, GraphExecutor};

use crate::orchestrator::{CouncilOrchestrator, CouncilOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub council: PathBuf,
    pub avots: Vec<PathBuf>,
    pub input: String,
    #[serde(default)]
    pub expect: Option<Expectation>,
}

/// Fields left unset are not checked.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Expectation {
    pub approved: Option<bool>,
    pub reason: Option<String>,
    pub sources: Option<Vec<String>>,
}

impl Expectation {
    /// Describe every field of `outcome` that differs from the expectation.
    pub fn mismatches(&self, outcome: &CouncilOutcome) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(approved) = self.approved.filter(|a| *a != outcome.approved) {
            out.push(format!(
                "approved: expected {}, got {}",
                approved, outcome.approved
            ));
        }
        if let Some(reason) = self.reason.as_ref().filter(|r| **r != outcome.reason) {
            out.push(format!(
                "reason: expected {:?}, got {:?}",
                reason, outcome.reason
            ));
        }
        if let Some(sources) = self.sources.as_ref().filter(|s| **s != outcome.sources) {
            out.push(format!(
                "sources: expected {:?}, got {:?}",
                sources, outcome.sources
            ));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: CouncilOutcome,
    pub mismatches: Vec<String>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl Scenario {
    /// Load a scenario and resolve its file references.
    pub fn load(path: &Path) -> Result<Self> {
        let mut scenario: Scenario = load_toml(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        scenario.council = base.join(&scenario.council);
        scenario.avots = scenario.avots.iter().map(|p| base.join(p)).collect();
        Ok(scenario)
    }

    /// Load the council and agents, run one council cycle on the input, and
    /// compare the outcome with the expectation.
    pub async fn run(
        &self,
        defaults: &SpecDefaults,
        executor: GraphExecutor,
    ) -> Result<ScenarioReport> {
        let council = CouncilSpec::load(&self.council)?;
        let agents = self
            .avots
            .iter()
            .map(|path| prepare(WorkflowSpec::load(path)?, defaults))
            .collect::<Result<Vec<_>>>()?;

        let orchestrator = CouncilOrchestrator::new(council, executor).with_agents(agents);
        info!(scenario = %self.name, agents = orchestrator.agent_count(), "Running scenario");

        let outcome = orchestrator.handle(&self.input).await?;
        let mismatches = self
            .expect
            .as_ref()
            .map(|e| e.mismatches(&outcome))
            .unwrap_or_default();

        Ok(ScenarioReport {
            name: self.name.clone(),
            outcome,
            mismatches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn outcome(approved: bool, reason: &str, sources: &[&str]) -> CouncilOutcome {
        CouncilOutcome {
            approved,
            output: approved.then(|| serde_json::json!("x")),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            details: BTreeMap::new(),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_empty_expectation_always_matches() {
        let expect = Expectation::default();
        assert!(expect.mismatches(&outcome(false, "nope", &[])).is_empty());
    }

    #[test]
    fn test_mismatches_listed_per_field() {
        let expect = Expectation {
            approved: Some(true),
            reason: Some("approved and merged".into()),
            sources: Some(vec!["B".into()]),
        };
        let found = expect.mismatches(&outcome(false, "Quorum not met (1/2)", &["B"]));
        assert_eq!(found.len(), 2);
        assert!(found[0].starts_with("approved:"));
        assert!(found[1].contains("Quorum not met (1/2)"));
    }

    #[test]
    fn test_parse_scenario() {
        let scenario: Scenario = toml::from_str(
            r#"
            name = "quorum"
            council = "council.toml"
            avots = ["a.toml"]
            input = "flood"

            [expect]
            approved = false
            "#,
        )
        .unwrap();
        assert_eq!(scenario.avots, vec![PathBuf::from("a.toml")]);
        assert_eq!(scenario.expect.unwrap().approved, Some(false));
    }
}

use std::path::{Path, PathBuf};

use avot_core::config::{SpecDefaults, StubConfig};
use avot_core::{CouncilSpec, WorkflowSpec};
use avot_council::{CouncilOrchestrator, Scenario};
use avot_runtime::{prepare, stub_capabilities, GraphExecutor};

fn demos() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn stub_executor() -> GraphExecutor {
    GraphExecutor::new(stub_capabilities(&StubConfig::default()))
}

async fn run_scenario(file: &str) -> avot_council::ScenarioReport {
    let scenario = Scenario::load(&demos().join("scenarios").join(file)).expect("load scenario");
    scenario
        .run(&SpecDefaults::default(), stub_executor())
        .await
        .expect("run scenario")
}

#[tokio::test]
async fn test_emergency_routes_by_rule() {
    let report = run_scenario("emergency.toml").await;
    assert!(report.passed(), "mismatches: {:?}", report.mismatches);
    assert!(report.outcome.details.is_empty());
}

#[tokio::test]
async fn test_flood_routes_by_domain() {
    let report = run_scenario("flood.toml").await;
    assert!(report.passed(), "mismatches: {:?}", report.mismatches);

    let output = report.outcome.output.expect("approved output");
    assert_eq!(output["output"]["ok"], true);
    assert_eq!(output["output"]["signature"], "calm-current");
}

#[tokio::test]
async fn test_weapon_request_rejected() {
    let report = run_scenario("weapon.toml").await;
    assert!(report.passed(), "mismatches: {:?}", report.mismatches);
    assert!(report.outcome.output.is_none());
}

#[tokio::test]
async fn test_quorum_of_two_rejects() {
    let report = run_scenario("quorum.toml").await;
    assert!(report.passed(), "mismatches: {:?}", report.mismatches);
}

#[tokio::test]
async fn test_expectation_mismatch_reported() {
    let mut scenario =
        Scenario::load(&demos().join("scenarios").join("quorum.toml")).expect("load scenario");
    if let Some(expect) = scenario.expect.as_mut() {
        expect.approved = Some(true);
    }

    let report = scenario
        .run(&SpecDefaults::default(), stub_executor())
        .await
        .expect("run scenario");
    assert!(!report.passed());
    assert_eq!(report.mismatches.len(), 1);
}

#[tokio::test]
async fn test_pause_policy_holds_output_below_threshold() {
    let dir = demos();
    let council = CouncilSpec::load(&dir.join("council.toml")).expect("load council");
    let air = prepare(
        WorkflowSpec::load(&dir.join("air.toml")).expect("load air"),
        &SpecDefaults::default(),
    )
    .expect("compile air");

    let caps = stub_capabilities(&StubConfig {
        coherence_score: 0.5,
    });
    let outcome = CouncilOrchestrator::new(council, GraphExecutor::new(caps))
        .with_agents([air])
        .handle("emergency")
        .await
        .expect("council cycle");

    assert!(outcome.approved);
    let output = outcome.output.expect("approved output");
    assert_eq!(output["paused"], true);
    assert_eq!(output["threshold"], 0.75);
    assert!(output.get("output").is_none());
}

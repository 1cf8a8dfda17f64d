//! Shared mocks and fixtures for AVOT tests.
//!
//! The mocks implement the capability traits deterministically so graph and
//! council tests can assert on exact payloads.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use avot_core::error::{AvotError, Result};
use avot_core::traits::{Capabilities, CoherenceEvaluator, Generation, Retrieval};
use avot_core::types::{Coherence, GenerationOptions, MemoryHit};
use avot_core::{
    AvotStatus, Cognition, CouncilMember, CouncilSpec, Ethics, Identity, Intent, LogicGraph,
    NodeDefinition, Permissions, ResonanceConfig, RoutingConfig, RoutingRule, VoteConfig,
    VotePolicy, WorkflowSpec,
};

/// A prompt the generation mock received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPrompt {
    pub prompt: String,
    pub options: GenerationOptions,
}

/// Generation mock returning a fixed completion and recording every call.
#[derive(Default)]
pub struct MockGeneration {
    reply: String,
    calls: Mutex<Vec<RecordedPrompt>>,
}

impl MockGeneration {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedPrompt> {
        self.calls.lock().unwrap().clone()
    }
}

impl Generation for MockGeneration {
    fn complete(&self, prompt: &str, options: GenerationOptions) -> BoxFuture<'_, Result<String>> {
        self.calls.lock().unwrap().push(RecordedPrompt {
            prompt: prompt.to_string(),
            options,
        });
        let reply = self.reply.clone();
        Box::pin(async move { Ok(reply) })
    }
}

/// Generation mock that always fails.
pub struct FailingGeneration;

impl Generation for FailingGeneration {
    fn complete(&self, _prompt: &str, _options: GenerationOptions) -> BoxFuture<'_, Result<String>> {
        Box::pin(async { Err(AvotError::capability("generation", "provider unavailable")) })
    }
}

/// Generation mock that never resolves.
pub struct PendingGeneration;

impl Generation for PendingGeneration {
    fn complete(&self, _prompt: &str, _options: GenerationOptions) -> BoxFuture<'_, Result<String>> {
        Box::pin(futures::future::pending::<Result<String>>())
    }
}

/// Retrieval mock returning one hit per source, echoing the query.
#[derive(Default)]
pub struct EchoRetrieval;

impl Retrieval for EchoRetrieval {
    fn search(&self, query: &str, sources: &[String]) -> BoxFuture<'_, Result<Vec<MemoryHit>>> {
        let hits = sources
            .iter()
            .map(|s| MemoryHit::new(s.clone(), format!("hit for {}", query)))
            .collect();
        Box::pin(async move { Ok(hits) })
    }
}

/// Coherence mock returning a fixed score.
pub struct FixedCoherence {
    score: f64,
}

impl FixedCoherence {
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

impl CoherenceEvaluator for FixedCoherence {
    fn evaluate(&self, expected_signature: Option<&str>) -> BoxFuture<'_, Result<Coherence>> {
        let coherence = Coherence {
            score: self.score,
            signature: expected_signature.map(str::to_string),
        };
        Box::pin(async move { Ok(coherence) })
    }
}

/// Capabilities built from mocks: canned generation, echo retrieval, fixed score.
pub fn mock_capabilities(reply: &str, score: f64) -> Capabilities {
    Capabilities::new(
        Arc::new(MockGeneration::new(reply)),
        Arc::new(EchoRetrieval),
        Arc::new(FixedCoherence::new(score)),
    )
}

/// Capabilities with a caller-held generation mock, for prompt assertions.
pub fn capabilities_with(generation: Arc<dyn Generation>, score: f64) -> Capabilities {
    Capabilities::new(generation, Arc::new(EchoRetrieval), Arc::new(FixedCoherence::new(score)))
}

/// Build a workflow whose nodes run in the given order as a linear chain.
pub fn linear_spec(avot_id: &str, nodes: Vec<(&str, NodeDefinition)>) -> WorkflowSpec {
    let entry = nodes.first().map(|(id, _)| id.to_string()).unwrap_or_default();
    let flow = nodes
        .windows(2)
        .map(|pair| format!("{} -> {}", pair[0].0, pair[1].0))
        .collect();
    let nodes: BTreeMap<String, NodeDefinition> =
        nodes.into_iter().map(|(id, n)| (id.to_string(), n)).collect();

    WorkflowSpec {
        identity: Identity {
            avot_id: avot_id.to_string(),
            name: format!("{} agent", avot_id),
            title: None,
            version: "0.1.0".to_string(),
            author: None,
            lineage: None,
            status: AvotStatus::Active,
            tags: vec![],
        },
        intent: Intent {
            purpose: "test fixture".to_string(),
            ..Default::default()
        },
        ethics: Ethics {
            codices: vec!["stewardship".to_string()],
            constraints: vec!["no_weaponization".to_string()],
        },
        resonance: Some(ResonanceConfig {
            enabled: true,
            coherence_threshold: Some(0.72),
            ..Default::default()
        }),
        cognition: Cognition {
            temperature: Some(0.4),
            ..Default::default()
        },
        memory: None,
        logic: LogicGraph {
            entry,
            nodes,
            flow,
        },
        permissions: Permissions::default(),
    }
}

/// The standard agent chain: input -> ethics_check -> output.
pub fn steward_spec(avot_id: &str) -> WorkflowSpec {
    linear_spec(
        avot_id,
        vec![
            ("intake", NodeDefinition::input()),
            ("ethics", NodeDefinition::ethics_check()),
            ("emit", NodeDefinition::output(false)),
        ],
    )
}

/// Two-member council: A (domain "water"), B (domain "air"),
/// rule `emergency -> B`, majority vote with the given quorum.
pub fn water_air_council(quorum: usize) -> CouncilSpec {
    CouncilSpec {
        members: vec![
            CouncilMember::new("A").with_domain("water"),
            CouncilMember::new("B").with_domain("air"),
        ],
        routing: Some(RoutingConfig {
            rules: vec![RoutingRule::new(vec!["emergency".to_string()], "B")],
            fallback: None,
        }),
        vote: VoteConfig {
            quorum,
            policy: VotePolicy::Majority,
            steward_veto: false,
        },
    }
}

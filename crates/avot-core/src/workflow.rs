use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::load_toml;
use crate::error::Result;

/// Fallback coherence threshold when neither the node nor the runtime sets one.
pub const DEFAULT_COHERENCE_THRESHOLD: f64 = 0.72;

/// A declarative agent workflow (an "AVOT scroll"), already parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub identity: Identity,
    pub intent: Intent,
    #[serde(default)]
    pub ethics: Ethics,
    #[serde(default)]
    pub resonance: Option<ResonanceConfig>,
    #[serde(default)]
    pub cognition: Cognition,
    #[serde(default)]
    pub memory: Option<MemoryConfig>,
    pub logic: LogicGraph,
    #[serde(default)]
    pub permissions: Permissions,
}

impl WorkflowSpec {
    /// Load a workflow spec from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvotStatus {
    Active,
    Inactive,
    #[default]
    Draft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub avot_id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub lineage: Option<String>,
    #[serde(default)]
    pub status: AvotStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Intent {
    pub purpose: String,
    #[serde(default)]
    pub resonance_signature: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
}

/// Ethics policy: codices the agent adheres to and the constraint keywords
/// that the `ethics_check` node enforces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ethics {
    #[serde(default)]
    pub codices: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// What an `output` node does when coherence falls below threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Soften,
    Pause,
    Fallback,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResonanceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub baseline_signature: Option<String>,
    #[serde(default)]
    pub coherence_threshold: Option<f64>,
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,
}

impl ResonanceConfig {
    pub fn threshold(&self) -> f64 {
        self.coherence_threshold.unwrap_or(DEFAULT_COHERENCE_THRESHOLD)
    }

    pub fn policy(&self) -> FailurePolicy {
        self.failure_policy.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cognition {
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default)]
    pub preferred_models: Vec<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub reasoning_style: Option<String>,
    #[serde(default)]
    pub fallback_behavior: Option<String>,
}

fn default_engine() -> String {
    "abstract-llm".to_string()
}

impl Default for Cognition {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            preferred_models: vec![],
            temperature: None,
            reasoning_style: None,
            fallback_behavior: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortTermMemory {
    Session,
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermMemory {
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
    #[serde(default)]
    pub retention_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub short_term: Option<ShortTermMemory>,
    #[serde(default)]
    pub long_term: Option<LongTermMemory>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkAccess {
    #[default]
    #[serde(rename = "none")]
    Disabled,
    Restricted,
    Unrestricted,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub external_network: NetworkAccess,
    #[serde(default)]
    pub file_write: bool,
    #[serde(default)]
    pub autonomous_actions: bool,
}

/// Source form of the logic graph: nodes keyed by id and `"A -> B"` edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicGraph {
    pub entry: String,
    pub nodes: BTreeMap<String, NodeDefinition>,
    #[serde(default)]
    pub flow: Vec<String>,
}

/// The closed set of node kinds the executor can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Input,
    Reasoning,
    MemoryLookup,
    Generation,
    EthicsCheck,
    ResonanceEval,
    Output,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Reasoning => "reasoning",
            NodeKind::MemoryLookup => "memory_lookup",
            NodeKind::Generation => "generation",
            NodeKind::EthicsCheck => "ethics_check",
            NodeKind::ResonanceEval => "resonance_eval",
            NodeKind::Output => "output",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the logic graph, tagged by `type`.
///
/// Unknown `type` values fail deserialization; there is no catch-all kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeDefinition {
    Input {
        #[serde(default)]
        description: Option<String>,
    },
    Reasoning {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        resonance_hint: Option<String>,
    },
    MemoryLookup {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        sources: Vec<String>,
    },
    Generation {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        format: Option<String>,
    },
    EthicsCheck {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        codex: Option<String>,
    },
    ResonanceEval {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        expected_signature: Option<String>,
        #[serde(default)]
        threshold: Option<f64>,
    },
    Output {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        requires_coherence: bool,
        #[serde(default)]
        format: Option<String>,
    },
}

impl NodeDefinition {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeDefinition::Input { .. } => NodeKind::Input,
            NodeDefinition::Reasoning { .. } => NodeKind::Reasoning,
            NodeDefinition::MemoryLookup { .. } => NodeKind::MemoryLookup,
            NodeDefinition::Generation { .. } => NodeKind::Generation,
            NodeDefinition::EthicsCheck { .. } => NodeKind::EthicsCheck,
            NodeDefinition::ResonanceEval { .. } => NodeKind::ResonanceEval,
            NodeDefinition::Output { .. } => NodeKind::Output,
        }
    }

    /// The prompt for prompt-bearing kinds (reasoning, generation).
    pub fn prompt(&self) -> Option<&str> {
        match self {
            NodeDefinition::Reasoning { prompt, .. } | NodeDefinition::Generation { prompt, .. } => {
                prompt.as_deref()
            }
            _ => None,
        }
    }

    pub fn input() -> Self {
        NodeDefinition::Input { description: None }
    }

    pub fn reasoning(prompt: impl Into<String>) -> Self {
        NodeDefinition::Reasoning {
            description: None,
            prompt: Some(prompt.into()),
            resonance_hint: None,
        }
    }

    pub fn memory_lookup(sources: Vec<String>) -> Self {
        NodeDefinition::MemoryLookup {
            description: None,
            sources,
        }
    }

    pub fn generation(prompt: impl Into<String>) -> Self {
        NodeDefinition::Generation {
            description: None,
            prompt: Some(prompt.into()),
            format: None,
        }
    }

    pub fn ethics_check() -> Self {
        NodeDefinition::EthicsCheck {
            description: None,
            codex: None,
        }
    }

    pub fn resonance_eval(expected_signature: Option<String>, threshold: Option<f64>) -> Self {
        NodeDefinition::ResonanceEval {
            description: None,
            expected_signature,
            threshold,
        }
    }

    pub fn output(requires_coherence: bool) -> Self {
        NodeDefinition::Output {
            description: None,
            requires_coherence,
            format: None,
        }
    }
}

/// Immutable, executable form of a logic graph.
///
/// `entry` and every edge endpoint are expected to key into `nodes`;
/// that is checked by validation, not by compilation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledGraph {
    pub entry: String,
    pub nodes: BTreeMap<String, NodeDefinition>,
    pub edges: Vec<(String, String)>,
}

/// Identity summary emitted alongside a compiled graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub avot_id: String,
    pub name: String,
    pub version: String,
    pub status: AvotStatus,
    pub intent: Intent,
    pub ethics: Ethics,
}

/// Runtime policy handed to every node handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub cognition: Cognition,
    #[serde(default)]
    pub memory: Option<MemoryConfig>,
    #[serde(default)]
    pub resonance: Option<ResonanceConfig>,
    pub permissions: Permissions,
    pub ethics: Ethics,
}

impl RuntimeConfig {
    /// Resonance config, only when resonance gating is switched on.
    pub fn active_resonance(&self) -> Option<&ResonanceConfig> {
        self.resonance.as_ref().filter(|r| r.enabled)
    }

    /// Model hint passed to the generation capability.
    pub fn preferred_model(&self) -> Option<&str> {
        self.cognition.preferred_models.first().map(String::as_str)
    }
}

/// An agent ready to run: manifest, compiled graph, and runtime policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledAvot {
    pub manifest: Manifest,
    pub graph: CompiledGraph,
    pub runtime: RuntimeConfig,
}

impl CompiledAvot {
    pub fn avot_id(&self) -> &str {
        &self.manifest.avot_id
    }
}

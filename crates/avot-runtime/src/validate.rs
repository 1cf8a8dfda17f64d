use std::fmt;

use serde::Serialize;
use tracing::warn;

use avot_core::config::SpecDefaults;
use avot_core::error::{AvotError, Result};
use avot_core::workflow::ShortTermMemory;
use avot_core::{CompiledAvot, MemoryConfig, NodeDefinition, NodeKind, WorkflowSpec};

use crate::compile::{compile, parse_edge};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => f.write_str("error"),
            Level::Warn => f.write_str("warn"),
        }
    }
}

/// A single validation finding against a workflow spec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub path: String,
}

impl Diagnostic {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            path: path.into(),
        }
    }

    fn warn(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warn,
            message: message.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.level, self.path, self.message)
    }
}

pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.level == Level::Error)
}

/// Check the structural preconditions the compiler and executor rely on.
pub fn validate(spec: &WorkflowSpec) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    if spec.identity.avot_id.trim().is_empty() {
        diags.push(Diagnostic::error("identity.avot_id", "Missing identity.avot_id"));
    }
    if spec.intent.purpose.trim().is_empty() {
        diags.push(Diagnostic::error("intent.purpose", "Missing intent.purpose"));
    }
    if spec.ethics.codices.is_empty() {
        diags.push(Diagnostic::error("ethics.codices", "Missing ethics.codices"));
    }
    for (i, constraint) in spec.ethics.constraints.iter().enumerate() {
        if constraint.trim().is_empty() {
            diags.push(Diagnostic::error(
                format!("ethics.constraints[{}]", i),
                "Blank ethics constraint",
            ));
        }
    }

    let logic = &spec.logic;
    if logic.entry.trim().is_empty() {
        diags.push(Diagnostic::error("logic.entry", "Missing logic.entry"));
    } else if !logic.nodes.contains_key(&logic.entry) {
        diags.push(Diagnostic::error(
            "logic.entry",
            format!("logic.entry node '{}' not found", logic.entry),
        ));
    }

    for edge in &logic.flow {
        let Some((from, to)) = parse_edge(edge) else {
            diags.push(Diagnostic::error("logic.flow", format!("Invalid flow edge: '{}'", edge)));
            continue;
        };
        for endpoint in [from, to] {
            if !logic.nodes.contains_key(&endpoint) {
                diags.push(Diagnostic::error(
                    "logic.flow",
                    format!("Flow references unknown node '{}'", endpoint),
                ));
            }
        }
    }

    if !logic.nodes.values().any(|n| n.kind() == NodeKind::Output) {
        diags.push(Diagnostic::warn("logic.nodes", "No output node found (recommended)"));
    }

    for (id, node) in &logic.nodes {
        match node {
            NodeDefinition::Reasoning { prompt: None, .. }
            | NodeDefinition::Generation { prompt: None, .. } => {
                diags.push(Diagnostic::warn(
                    format!("logic.nodes.{}.prompt", id),
                    format!("Node '{}' missing prompt", id),
                ));
            }
            NodeDefinition::ResonanceEval { threshold: None, .. } => {
                diags.push(Diagnostic::warn(
                    format!("logic.nodes.{}.threshold", id),
                    format!("Node '{}' missing threshold (will use global/default)", id),
                ));
            }
            _ => {}
        }
    }

    diags
}

/// Fill unset cognition, memory, and resonance fields from `defaults`.
pub fn normalize(mut spec: WorkflowSpec, defaults: &SpecDefaults) -> WorkflowSpec {
    spec.cognition.temperature.get_or_insert(defaults.temperature);

    spec.memory.get_or_insert_with(|| MemoryConfig {
        short_term: Some(ShortTermMemory::Session),
        long_term: None,
    });

    if let Some(resonance) = spec.resonance.as_mut().filter(|r| r.enabled) {
        resonance
            .coherence_threshold
            .get_or_insert(defaults.coherence_threshold);
        resonance.failure_policy.get_or_insert(defaults.failure_policy);
    }

    spec
}

/// Normalize, validate, and compile a spec in one step.
///
/// Warnings are logged. Any error-level diagnostic fails the whole spec.
pub fn prepare(spec: WorkflowSpec, defaults: &SpecDefaults) -> Result<CompiledAvot> {
    let spec = normalize(spec, defaults);
    let diags = validate(&spec);

    let mut errors = Vec::new();
    for diag in &diags {
        match diag.level {
            Level::Warn => warn!(avot_id = %spec.identity.avot_id, "{}", diag),
            Level::Error => errors.push(diag.to_string()),
        }
    }
    if !errors.is_empty() {
        return Err(AvotError::Config(format!(
            "invalid AVOT '{}': {}",
            spec.identity.avot_id,
            errors.join("; ")
        )));
    }

    Ok(compile(spec))
}

//! Per-kind node handlers.
//!
//! Each handler maps `(payload, state, runtime, capabilities)` to a new
//! payload. Side effects are limited to appending to the execution state.

use serde_json::{json, Value};
use tracing::{debug, warn};

use avot_core::error::Result;
use avot_core::traits::Capabilities;
use avot_core::types::{payload_text, GenerationOptions};
use avot_core::{
    ExecutionState, FailurePolicy, NodeDefinition, ResonanceSample, RuntimeConfig,
    DEFAULT_COHERENCE_THRESHOLD,
};

/// How many of the most recent memory hits a generation prompt includes.
pub const MEMORY_CONTEXT_WINDOW: usize = 6;

/// Dispatch one node to the handler for its kind.
pub async fn dispatch(
    node_id: &str,
    node: &NodeDefinition,
    payload: Value,
    state: &mut ExecutionState,
    runtime: &RuntimeConfig,
    caps: &Capabilities,
) -> Result<Value> {
    match node {
        NodeDefinition::Input { .. } => Ok(payload),
        NodeDefinition::Reasoning { prompt, .. } => {
            reasoning(prompt.as_deref(), payload, runtime, caps).await
        }
        NodeDefinition::MemoryLookup { sources, .. } => {
            memory_lookup(sources, &payload, state, caps).await
        }
        NodeDefinition::Generation { prompt, .. } => {
            generation(prompt.as_deref(), payload, state, runtime, caps).await
        }
        NodeDefinition::EthicsCheck { .. } => Ok(ethics_check(payload, state, runtime)),
        NodeDefinition::ResonanceEval {
            expected_signature,
            threshold,
            ..
        } => {
            resonance_eval(
                node_id,
                expected_signature.as_deref(),
                *threshold,
                state,
                runtime,
                caps,
            )
            .await
        }
        NodeDefinition::Output {
            requires_coherence, ..
        } => Ok(output(*requires_coherence, payload, state, runtime)),
    }
}

fn generation_options(runtime: &RuntimeConfig) -> GenerationOptions {
    GenerationOptions {
        temperature: runtime.cognition.temperature,
        model: runtime.preferred_model().map(str::to_string),
    }
}

async fn reasoning(
    prompt: Option<&str>,
    payload: Value,
    runtime: &RuntimeConfig,
    caps: &Capabilities,
) -> Result<Value> {
    let analysis = caps
        .generation
        .complete(prompt.unwrap_or_default(), generation_options(runtime))
        .await?;
    Ok(json!({ "analysis": analysis, "extracted": payload }))
}

async fn memory_lookup(
    sources: &[String],
    payload: &Value,
    state: &mut ExecutionState,
    caps: &Capabilities,
) -> Result<Value> {
    let query = payload_text(payload);
    let hits = caps.retrieval.search(&query, sources).await?;
    debug!(hits = hits.len(), sources = sources.len(), "Memory lookup complete");

    state.extend_memory(hits.iter().cloned());
    Ok(json!({ "hits": hits }))
}

async fn generation(
    prompt: Option<&str>,
    payload: Value,
    state: &mut ExecutionState,
    runtime: &RuntimeConfig,
    caps: &Capabilities,
) -> Result<Value> {
    let context = json!({
        "input": payload,
        "memory_refs": state.recent_memory(MEMORY_CONTEXT_WINDOW),
    });
    let full_prompt = format!(
        "{}\n\nContext:\n{}",
        prompt.unwrap_or_default(),
        serde_json::to_string_pretty(&context)?
    );

    let draft = caps
        .generation
        .complete(&full_prompt, generation_options(runtime))
        .await?;
    Ok(json!({ "draft": draft }))
}

/// Terms whose presence in the payload violates `constraint`.
///
/// A blank constraint has no terms and never matches.
fn trigger_terms(constraint: &str) -> Vec<String> {
    let terms = match constraint.trim() {
        "no_weaponization" => vec!["weapon".to_string()],
        "no_harm" => vec!["harm".to_string()],
        other => match other.strip_prefix("no_") {
            Some(thing) if !thing.is_empty() => vec![thing.replace('_', " ")],
            _ => vec![other.replace('_', " ")],
        },
    };
    terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn ethics_check(payload: Value, state: &mut ExecutionState, runtime: &RuntimeConfig) -> Value {
    let text = payload_text(&payload).to_lowercase();

    let violated: Vec<String> = runtime
        .ethics
        .constraints
        .iter()
        .map(|c| c.to_lowercase())
        .filter(|c| trigger_terms(c).iter().any(|term| text.contains(term.as_str())))
        .collect();

    if violated.is_empty() {
        return json!({ "allowed": true, "input": payload });
    }

    warn!(constraints = ?violated, "Ethics constraint violated");
    let reason = format!("Ethics constraint: {}", violated.join(", "));
    for constraint in violated {
        state.raise_flag(constraint);
    }
    json!({ "allowed": false, "reason": reason, "input": payload })
}

async fn resonance_eval(
    node_id: &str,
    expected_signature: Option<&str>,
    node_threshold: Option<f64>,
    state: &mut ExecutionState,
    runtime: &RuntimeConfig,
    caps: &Capabilities,
) -> Result<Value> {
    let coherence = caps.coherence.evaluate(expected_signature).await?;

    state.record_resonance(ResonanceSample {
        node: node_id.to_string(),
        score: coherence.score,
        signature: coherence.signature.clone(),
    });

    let threshold = node_threshold
        .or_else(|| runtime.resonance.as_ref().and_then(|r| r.coherence_threshold))
        .unwrap_or(DEFAULT_COHERENCE_THRESHOLD);

    debug!(node_id, score = coherence.score, threshold, "Resonance evaluated");
    Ok(json!({
        "ok": coherence.score >= threshold,
        "score": coherence.score,
        "signature": coherence.signature,
        "threshold": threshold,
    }))
}

fn output(
    requires_coherence: bool,
    payload: Value,
    state: &ExecutionState,
    runtime: &RuntimeConfig,
) -> Value {
    let gate = runtime.active_resonance().filter(|_| requires_coherence);
    let Some(resonance) = gate else {
        return json!({ "output": payload });
    };

    let score = state.current_score().unwrap_or(0.0);
    let threshold = resonance.threshold();
    if score >= threshold {
        return json!({ "output": payload });
    }

    let policy = resonance.policy();
    warn!(score, threshold, policy = ?policy, "Coherence below threshold at output");
    match policy {
        FailurePolicy::Pause => json!({
            "paused": true,
            "message": "Coherence below threshold; pausing.",
            "score": score,
            "threshold": threshold,
        }),
        FailurePolicy::Fallback => json!({ "message": "fallback", "output": payload }),
        FailurePolicy::Soften => json!({ "message": "softened", "output": payload }),
    }
}

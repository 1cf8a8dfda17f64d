use tracing::{debug, warn};

use avot_core::{CompiledAvot, CompiledGraph, Manifest, RuntimeConfig, WorkflowSpec};

/// Compile a workflow spec into a manifest, an executable graph, and the
/// runtime policy its handlers read.
///
/// Inputs are assumed to be validated already (see [`crate::validate`]).
/// An edge string without `->` is skipped.
pub fn compile(spec: WorkflowSpec) -> CompiledAvot {
    let WorkflowSpec {
        identity,
        intent,
        ethics,
        resonance,
        cognition,
        memory,
        logic,
        permissions,
    } = spec;

    let edges = logic
        .flow
        .iter()
        .filter_map(|edge| {
            let parsed = parse_edge(edge);
            if parsed.is_none() {
                warn!(avot_id = %identity.avot_id, edge = %edge, "Skipping malformed flow edge");
            }
            parsed
        })
        .collect::<Vec<_>>();

    debug!(
        avot_id = %identity.avot_id,
        nodes = logic.nodes.len(),
        edges = edges.len(),
        "Compiled workflow graph"
    );

    let manifest = Manifest {
        avot_id: identity.avot_id,
        name: identity.name,
        version: identity.version,
        status: identity.status,
        intent,
        ethics: ethics.clone(),
    };

    let graph = CompiledGraph {
        entry: logic.entry,
        nodes: logic.nodes,
        edges,
    };

    let runtime = RuntimeConfig {
        cognition,
        memory,
        resonance,
        permissions,
        ethics,
    };

    CompiledAvot {
        manifest,
        graph,
        runtime,
    }
}

/// Split an `"A -> B"` flow string into a trimmed `(from, to)` pair.
pub fn parse_edge(edge: &str) -> Option<(String, String)> {
    let (from, to) = edge.split_once("->")?;
    let (from, to) = (from.trim(), to.trim());
    if from.is_empty() || to.is_empty() || to.contains("->") {
        return None;
    }
    Some((from.to_string(), to.to_string()))
}

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use avot_core::error::{AvotError, Result};
use avot_core::traits::Capabilities;
use avot_core::{CompiledAvot, CompiledGraph, ExecutionState, RuntimeConfig, StepRecord};

use super::handlers;

/// Result of executing an entire graph.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Payload produced by the last node.
    pub result: Value,
    /// Audit trail and logs accumulated during the run.
    pub state: ExecutionState,
}

/// Executes a compiled graph as a linear chain.
///
/// Starting at the entry node, each node is dispatched to its kind's handler
/// and the run advances to the node's *first* successor in edge order.
/// Further outgoing edges are ignored. The run ends at a node with no
/// successor. Revisiting a node aborts with [`AvotError::Cycle`].
pub struct GraphExecutor {
    caps: Capabilities,
    cancel: Option<CancellationToken>,
}

impl GraphExecutor {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps, cancel: None }
    }

    /// Abort runs with [`AvotError::Cancelled`] once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run a compiled agent on `input`.
    pub async fn run(&self, avot: &CompiledAvot, input: Value) -> Result<ExecutionResult> {
        self.execute(avot.avot_id(), &avot.graph, &avot.runtime, input)
            .await
    }

    /// Execute `graph` from its entry node with a fresh execution state.
    ///
    /// Any handler error aborts the run; the partially built state is dropped.
    pub async fn execute(
        &self,
        avot_id: &str,
        graph: &CompiledGraph,
        runtime: &RuntimeConfig,
        input: Value,
    ) -> Result<ExecutionResult> {
        let successors = successor_map(&graph.edges);
        let baseline = runtime
            .resonance
            .as_ref()
            .and_then(|r| r.baseline_signature.clone());
        let mut state = ExecutionState::new(avot_id).with_baseline(baseline);
        let mut visited: HashSet<&str> = HashSet::new();
        let mut payload = input;
        let mut current: Option<&str> = Some(graph.entry.as_str());

        info!(avot_id, session_id = %state.session_id, entry = %graph.entry, "Starting graph execution");

        while let Some(node_id) = current {
            if !visited.insert(node_id) {
                error!(avot_id, node_id, "Cycle detected, aborting execution");
                return Err(AvotError::Cycle {
                    node: node_id.to_string(),
                });
            }

            let node = graph.nodes.get(node_id).ok_or_else(|| {
                AvotError::Config(format!("Node '{}' not found in graph", node_id))
            })?;

            info!(avot_id, node_id, kind = %node.kind(), "Executing graph node");

            let step = handlers::dispatch(
                node_id,
                node,
                payload.clone(),
                &mut state,
                runtime,
                &self.caps,
            );
            let output = match &self.cancel {
                Some(token) => {
                    if token.is_cancelled() {
                        return Err(AvotError::Cancelled);
                    }
                    tokio::select! {
                        _ = token.cancelled() => return Err(AvotError::Cancelled),
                        out = step => out?,
                    }
                }
                None => step.await?,
            };

            state.record_step(StepRecord {
                node: node_id.to_string(),
                kind: node.kind(),
                input: payload,
                output: output.clone(),
            });
            debug!(avot_id, node_id, "Node execution complete");

            payload = output;
            current = successors
                .get(node_id)
                .and_then(|next| next.first())
                .copied();
        }

        info!(
            avot_id,
            steps = state.trace().len(),
            ethics_flags = state.ethics_flags().len(),
            "Graph execution complete"
        );

        Ok(ExecutionResult {
            result: payload,
            state,
        })
    }
}

/// Map each node to its successors, in edge declaration order.
fn successor_map(edges: &[(String, String)]) -> HashMap<&str, Vec<&str>> {
    let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
    for (from, to) in edges {
        map.entry(from.as_str()).or_default().push(to.as_str());
    }
    map
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MemoryHit, SessionId};
use crate::workflow::NodeKind;

/// One executed node in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub node: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub input: serde_json::Value,
    pub output: serde_json::Value,
}

/// One coherence score recorded by a `resonance_eval` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceSample {
    pub node: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResonanceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<String>,
    pub trace: Vec<ResonanceSample>,
}

/// Accumulator for a single graph execution.
///
/// Created fresh per run and owned by that run. Every log is append-only;
/// the only overwritten field is the current resonance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub avot_id: String,
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    trace: Vec<StepRecord>,
    ethics_flags: Vec<String>,
    memory_refs: Vec<MemoryHit>,
    resonance: ResonanceState,
}

impl ExecutionState {
    pub fn new(avot_id: impl Into<String>) -> Self {
        Self {
            avot_id: avot_id.into(),
            session_id: SessionId::new(),
            started_at: Utc::now(),
            trace: Vec::new(),
            ethics_flags: Vec::new(),
            memory_refs: Vec::new(),
            resonance: ResonanceState::default(),
        }
    }

    pub fn with_baseline(mut self, baseline: Option<String>) -> Self {
        self.resonance.baseline = baseline;
        self
    }

    pub fn record_step(&mut self, step: StepRecord) {
        self.trace.push(step);
    }

    pub fn raise_flag(&mut self, flag: impl Into<String>) {
        self.ethics_flags.push(flag.into());
    }

    pub fn extend_memory(&mut self, hits: impl IntoIterator<Item = MemoryHit>) {
        self.memory_refs.extend(hits);
    }

    /// The last `n` memory hits, oldest first.
    pub fn recent_memory(&self, n: usize) -> &[MemoryHit] {
        let start = self.memory_refs.len().saturating_sub(n);
        &self.memory_refs[start..]
    }

    pub fn record_resonance(&mut self, sample: ResonanceSample) {
        self.resonance.current_score = Some(sample.score);
        self.resonance.trace.push(sample);
    }

    pub fn current_score(&self) -> Option<f64> {
        self.resonance.current_score
    }

    pub fn trace(&self) -> &[StepRecord] {
        &self.trace
    }

    pub fn ethics_flags(&self) -> &[String] {
        &self.ethics_flags
    }

    pub fn has_ethics_flags(&self) -> bool {
        !self.ethics_flags.is_empty()
    }

    pub fn memory_refs(&self) -> &[MemoryHit] {
        &self.memory_refs
    }

    pub fn resonance(&self) -> &ResonanceState {
        &self.resonance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(n: usize) -> MemoryHit {
        MemoryHit::new(format!("src-{}", n), "snippet")
    }

    #[test]
    fn test_fresh_state_is_empty() {
        let state = ExecutionState::new("avot-1");
        assert_eq!(state.avot_id, "avot-1");
        assert!(state.trace().is_empty());
        assert!(!state.has_ethics_flags());
        assert!(state.memory_refs().is_empty());
        assert_eq!(state.current_score(), None);
    }

    #[test]
    fn test_recent_memory_window() {
        let mut state = ExecutionState::new("avot-1");
        state.extend_memory((0..8).map(hit));

        let recent = state.recent_memory(6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].source, "src-2");
        assert_eq!(recent[5].source, "src-7");

        assert_eq!(state.recent_memory(20).len(), 8);
    }

    #[test]
    fn test_resonance_tracks_latest_score() {
        let mut state = ExecutionState::new("avot-1");
        state.record_resonance(ResonanceSample {
            node: "r1".into(),
            score: 0.4,
            signature: None,
        });
        state.record_resonance(ResonanceSample {
            node: "r2".into(),
            score: 0.9,
            signature: Some("calm".into()),
        });

        assert_eq!(state.current_score(), Some(0.9));
        assert_eq!(state.resonance().trace.len(), 2);
        assert_eq!(state.resonance().trace[0].node, "r1");
    }

    #[test]
    fn test_flags_append_in_order() {
        let mut state = ExecutionState::new("avot-1");
        state.raise_flag("no_weaponization");
        state.raise_flag("no_harm");
        assert_eq!(state.ethics_flags(), ["no_weaponization", "no_harm"]);
    }
}

use serde::{Deserialize, Serialize};
use tracing::info;

use avot_core::{VoteConfig, VotePolicy};

/// One agent's ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteInput {
    pub avot_id: String,
    pub approved: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

impl VoteInput {
    pub fn approve(avot_id: impl Into<String>) -> Self {
        Self {
            avot_id: avot_id.into(),
            approved: true,
            weight: default_weight(),
            reason: None,
        }
    }

    pub fn reject(avot_id: impl Into<String>) -> Self {
        Self {
            approved: false,
            ..Self::approve(avot_id)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Outcome of a council vote. Id lists keep ballot order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteDecision {
    pub approved: bool,
    pub approved_ids: Vec<String>,
    pub rejected_ids: Vec<String>,
    pub reason: String,
}

/// Decide a vote.
///
/// Checks run in a fixed order: empty ballot, quorum, policy, then steward
/// veto. The veto scans every ballot's reason, approving or not.
pub fn decide(votes: &[VoteInput], config: &VoteConfig) -> VoteDecision {
    if votes.is_empty() {
        return VoteDecision {
            approved: false,
            approved_ids: vec![],
            rejected_ids: vec![],
            reason: "no votes provided".to_string(),
        };
    }

    let (approvals, rejections): (Vec<&VoteInput>, Vec<&VoteInput>) =
        votes.iter().partition(|v| v.approved);

    let verdict = |approved: bool, reason: String| VoteDecision {
        approved,
        approved_ids: approvals.iter().map(|v| v.avot_id.clone()).collect(),
        rejected_ids: rejections.iter().map(|v| v.avot_id.clone()).collect(),
        reason,
    };

    let decision = if approvals.len() < config.quorum {
        verdict(
            false,
            format!("Quorum not met ({}/{})", approvals.len(), config.quorum),
        )
    } else if let Some(reason) = policy_failure(config.policy, &approvals, &rejections) {
        verdict(false, reason)
    } else if let Some(veto) = config
        .steward_veto
        .then(|| votes.iter().find(|v| is_veto(v)))
        .flatten()
    {
        verdict(false, format!("Steward veto by {}", veto.avot_id))
    } else {
        verdict(true, "Council vote approved".to_string())
    };

    info!(
        approved = decision.approved,
        approvals = approvals.len(),
        rejections = rejections.len(),
        reason = %decision.reason,
        "Council vote decided"
    );
    decision
}

fn policy_failure(
    policy: VotePolicy,
    approvals: &[&VoteInput],
    rejections: &[&VoteInput],
) -> Option<String> {
    match policy {
        VotePolicy::Quorum => None,
        VotePolicy::Majority => {
            (approvals.len() <= rejections.len()).then(|| "Majority vote failed".to_string())
        }
        VotePolicy::WeightedMajority => {
            let weight = |votes: &[&VoteInput]| votes.iter().map(|v| v.weight).sum::<f64>();
            let (yes, no) = (weight(approvals), weight(rejections));
            (yes <= no).then(|| format!("Weighted majority failed ({:.2}/{:.2})", yes, no))
        }
    }
}

fn is_veto(vote: &VoteInput) -> bool {
    vote.reason
        .as_deref()
        .is_some_and(|r| r.to_lowercase().contains("veto"))
}

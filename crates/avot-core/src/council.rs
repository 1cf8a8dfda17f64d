use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::load_toml;
use crate::error::Result;

/// A council: members plus the routing and vote policy governing them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouncilSpec {
    pub members: Vec<CouncilMember>,
    #[serde(default)]
    pub routing: Option<RoutingConfig>,
    #[serde(default)]
    pub vote: VoteConfig,
}

impl CouncilSpec {
    /// Load a council scroll from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    pub fn member(&self, avot_id: &str) -> Option<&CouncilMember> {
        self.members.iter().find(|m| m.avot_id == avot_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilMember {
    pub avot_id: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl CouncilMember {
    pub fn new(avot_id: impl Into<String>) -> Self {
        Self {
            avot_id: avot_id.into(),
            role: None,
            domain: None,
            weight: default_weight(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Keyword rules, checked in declaration order.
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
    #[serde(default)]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    #[serde(alias = "if_contains")]
    pub keywords: Vec<String>,
    #[serde(alias = "send_to")]
    pub target: String,
}

impl RoutingRule {
    pub fn new(keywords: Vec<String>, target: impl Into<String>) -> Self {
        Self {
            keywords,
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotePolicy {
    /// Approvals must outnumber rejections.
    #[default]
    Majority,
    /// Approval weight must exceed rejection weight.
    WeightedMajority,
    /// Meeting the quorum is sufficient.
    Quorum,
}

impl fmt::Display for VotePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VotePolicy::Majority => "majority",
            VotePolicy::WeightedMajority => "weighted_majority",
            VotePolicy::Quorum => "quorum",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteConfig {
    #[serde(default = "default_quorum")]
    pub quorum: usize,
    #[serde(default)]
    pub policy: VotePolicy,
    #[serde(default)]
    pub steward_veto: bool,
}

fn default_quorum() -> usize {
    1
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            quorum: default_quorum(),
            policy: VotePolicy::default(),
            steward_veto: false,
        }
    }
}

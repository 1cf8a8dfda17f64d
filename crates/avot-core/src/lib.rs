pub mod config;
pub mod council;
pub mod error;
pub mod state;
pub mod traits;
pub mod types;
pub mod workflow;

pub use config::AppConfig;
pub use council::{CouncilMember, CouncilSpec, RoutingConfig, RoutingRule, VoteConfig, VotePolicy};
pub use error::{AvotError, Result};
pub use state::{ExecutionState, ResonanceSample, StepRecord};
pub use traits::{Capabilities, CoherenceEvaluator, Generation, Retrieval};
pub use types::*;
pub use workflow::*;

//! The council protocol: route a request to one agent, run it, vote on the
//! result, and release the merged output.

pub mod merge;
pub mod orchestrator;
pub mod router;
pub mod scenario;
pub mod vote;

pub use merge::{merge, AgentOutput, MergeResult, SupportingOutput};
pub use orchestrator::{CouncilOrchestrator, CouncilOutcome};
pub use router::{route, RouteDecision};
pub use scenario::{Expectation, Scenario, ScenarioReport};
pub use vote::{decide, VoteDecision, VoteInput};

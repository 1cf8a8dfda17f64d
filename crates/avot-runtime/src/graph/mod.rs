//! Linear-chain execution of compiled AVOT graphs.
//!
//! A compiled graph is a map of typed nodes plus an ordered edge list.
//! The `GraphExecutor` walks it from the entry node, dispatching each node
//! to the handler for its kind and threading an `ExecutionState` through
//! every step as the run's audit trail.

pub mod executor;
pub mod handlers;

pub use executor::{ExecutionResult, GraphExecutor};
pub use handlers::MEMORY_CONTEXT_WINDOW;

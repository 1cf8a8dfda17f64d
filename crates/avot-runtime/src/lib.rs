pub mod compile;
pub mod graph;
pub mod providers;
pub mod validate;

pub use compile::{compile, parse_edge};
pub use graph::{ExecutionResult, GraphExecutor};
pub use providers::stub_capabilities;
pub use validate::{has_errors, normalize, prepare, validate, Diagnostic, Level};

pub mod step;
pub mod runner;
pub mod executor;

pub use step::Step;
pub use runner::{ExecutionResult, Runner};
pub use executor::{Pipeline, RunState, RunSummary};

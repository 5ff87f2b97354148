//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::Orchestrator;
pub use stats::RunStats;

pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod parse;
pub mod report;
pub mod runner;
pub mod schema;
pub mod suite;
pub mod vcs;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BenchmarkError, Error, Result};
pub use orchestrator::{Orchestrator, RunOutcome, RunSettings};

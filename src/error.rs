//! Error taxonomy.
//!
//! [`Error`] aborts a run. [`BenchmarkError`] only ever skips one benchmark;
//! the selector logs it and moves on. A detected regression is neither: it is
//! a computed outcome (see [`crate::orchestrator::RunOutcome::regressed`]).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that end the run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to read configuration '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("the repository is dirty: commit all changes before running")]
    DirtyWorkingCopy,

    #[error("unable to resolve revision '{reference}': {source}")]
    UnresolvableRevision {
        reference: String,
        #[source]
        source: VcsError,
    },

    #[error("no tag parses as a release version")]
    NoReleaseFound,

    #[error(transparent)]
    SourceControl(#[from] VcsError),

    #[error("failed to write report: {0}")]
    Report(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a [`crate::vcs::SourceControl`] backend.
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("git: {0}")]
    Git(#[from] git2::Error),

    #[error("unknown revision '{0}'")]
    UnknownRevision(String),

    #[error("invalid revision id '{0}'")]
    InvalidId(String),
}

/// Per-benchmark failures. Logged, never propagated past the selector.
#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {status}")]
    Execution { command: String, status: String },

    #[error("expected exactly one benchmark result for '{name}', got {count}")]
    MeasurementCount { name: String, count: usize },

    #[error("more than one benchmark with unique name '{0}'")]
    DuplicateUniqueName(String),
}

//! External benchmark execution.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, warn};

use crate::config::ResolvedBenchmark;
use crate::error::BenchmarkError;

/// Trailing stderr text meaning the name filter matched no package.
pub const NO_PACKAGES_SIGNAL: &str = "no packages to test";

/// A fully-formed command line for one benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn for_benchmark(program: &str, benchmark: &ResolvedBenchmark) -> Self {
        let cfg = &benchmark.config;
        let mut args: Vec<String> = vec![
            "test".into(),
            "-run".into(),
            "^$".into(),
            "-bench".into(),
            benchmark.name.clone(),
            "-benchtime".into(),
            cfg.benchtime.clone(),
            "-timeout".into(),
            cfg.timeout.clone(),
            "-cpu".into(),
            cfg.cpu.clone(),
        ];
        if cfg.benchmem {
            args.push("-benchmem".into());
        }
        args.push(benchmark.package.clone());

        Self {
            program: program.to_string(),
            args,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutput {
    /// Captured stdout of a successful run.
    Completed(String),
    /// The target package had nothing to run; not an error.
    NoMatchingTarget,
}

/// Something that can execute a benchmark invocation and hand back its output.
pub trait BenchRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput, BenchmarkError>;
}

/// Runs invocations as child processes inside the working copy.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    pub working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

impl BenchRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput, BenchmarkError> {
        debug!(command = %invocation, "running benchmark");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|source| BenchmarkError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(RunOutput::Completed(stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.trim().ends_with(NO_PACKAGES_SIGNAL) {
            return Ok(RunOutput::NoMatchingTarget);
        }

        warn!(command = %invocation, stdout = %stdout, stderr = %stderr, "benchmark command failed");
        Err(BenchmarkError::Execution {
            command: invocation.to_string(),
            status: output.status.to_string(),
        })
    }
}

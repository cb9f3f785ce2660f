//! Benchmark selection and execution at one revision.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ResolvedBenchmark;
use crate::error::BenchmarkError;
use crate::parse::{parse_output, Measurement};
use crate::runner::{BenchRunner, Invocation, RunOutput};
use crate::version;

/// Measurements for one revision keyed by unique name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: BTreeMap<String, Measurement>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, unique_name: &str) -> Option<&Measurement> {
        self.results.get(unique_name)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Insert a measurement; a repeated unique name is rejected and the
    /// existing entry kept.
    pub fn insert(
        &mut self,
        unique_name: &str,
        measurement: Measurement,
    ) -> Result<(), BenchmarkError> {
        if self.results.contains_key(unique_name) {
            return Err(BenchmarkError::DuplicateUniqueName(unique_name.to_string()));
        }
        self.results.insert(unique_name.to_string(), measurement);
        Ok(())
    }
}

impl FromIterator<(String, Measurement)> for ResultSet {
    fn from_iter<I: IntoIterator<Item = (String, Measurement)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().collect(),
        }
    }
}

/// Runs the configured benchmark list through a [`BenchRunner`].
pub struct BenchmarkSuite<'a, R> {
    command: &'a str,
    benchmarks: &'a [ResolvedBenchmark],
    runner: &'a R,
}

impl<'a, R: BenchRunner> BenchmarkSuite<'a, R> {
    pub fn new(command: &'a str, benchmarks: &'a [ResolvedBenchmark], runner: &'a R) -> Self {
        Self {
            command,
            benchmarks,
            runner,
        }
    }

    pub fn benchmarks(&self) -> &'a [ResolvedBenchmark] {
        self.benchmarks
    }

    /// Run every applicable benchmark.
    ///
    /// `revision_tag` is set only for release revisions; benchmarks whose
    /// version constraint rejects it are skipped. Per-benchmark failures are
    /// logged and skipped, never returned.
    pub fn run(&self, revision_tag: Option<&str>) -> ResultSet {
        let mut set = ResultSet::new();
        for benchmark in self.benchmarks {
            if let Some(tag) = revision_tag {
                if !version::matches(&benchmark.version, tag) {
                    debug!(
                        benchmark = %benchmark.unique_name,
                        constraint = %benchmark.version,
                        tag,
                        "skipping benchmark: version constraint not met"
                    );
                    continue;
                }
            }

            match self.run_one(benchmark) {
                Ok(Some(measurement)) => {
                    if let Err(err) = set.insert(&benchmark.unique_name, measurement) {
                        warn!(benchmark = %benchmark.unique_name, error = %err, "skipping benchmark");
                    }
                }
                Ok(None) => {
                    info!(benchmark = %benchmark.unique_name, package = %benchmark.package, "no matching benchmark in package");
                }
                Err(err) => {
                    warn!(benchmark = %benchmark.unique_name, error = %err, "skipping benchmark");
                }
            }
        }
        set
    }

    fn run_one(&self, benchmark: &ResolvedBenchmark) -> Result<Option<Measurement>, BenchmarkError> {
        let invocation = Invocation::for_benchmark(self.command, benchmark);
        let stdout = match self.runner.run(&invocation)? {
            RunOutput::Completed(stdout) => stdout,
            RunOutput::NoMatchingTarget => return Ok(None),
        };

        let mut measurements = parse_output(&stdout);
        if measurements.len() != 1 {
            return Err(BenchmarkError::MeasurementCount {
                name: benchmark.unique_name.clone(),
                count: measurements.len(),
            });
        }
        Ok(measurements.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{resolved, FakeRunner};

    #[test]
    fn test_collects_one_result_per_benchmark() {
        let benchmarks = vec![resolved("BenchmarkA", ""), resolved("BenchmarkB", "")];
        let runner = FakeRunner::new()
            .with_output("BenchmarkA", "BenchmarkA-4 100 120 ns/op 16 B/op\n")
            .with_output("BenchmarkB", "BenchmarkB-4 100 80 ns/op 0 B/op\n");
        let suite = BenchmarkSuite::new("go", &benchmarks, &runner);

        let set = suite.run(None);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("BenchmarkA").unwrap().ns_per_op, 120.0);
        assert_eq!(set.get("BenchmarkB").unwrap().allocated_bytes_per_op, 0);
    }

    #[test]
    fn test_version_gate_only_applies_to_release_tags() {
        let benchmarks = vec![resolved("BenchmarkNew", ">=v2.0.0")];
        let runner = FakeRunner::new().with_output("BenchmarkNew", "BenchmarkNew 1 10 ns/op\n");
        let suite = BenchmarkSuite::new("go", &benchmarks, &runner);

        assert!(suite.run(Some("v1.9.0")).is_empty());
        assert_eq!(runner.invocations().len(), 0);

        assert_eq!(suite.run(Some("v2.0.0")).len(), 1);
        assert_eq!(suite.run(None).len(), 1);
    }

    #[test]
    fn test_failures_do_not_abort_remaining_benchmarks() {
        let benchmarks = vec![
            resolved("BenchmarkFails", ""),
            resolved("BenchmarkEmpty", ""),
            resolved("BenchmarkTwice", ""),
            resolved("BenchmarkMissing", ""),
            resolved("BenchmarkGood", ""),
        ];
        let runner = FakeRunner::new()
            .with_failure("BenchmarkFails")
            .with_output("BenchmarkEmpty", "PASS\n")
            .with_output(
                "BenchmarkTwice",
                "BenchmarkTwice-1 1 1 ns/op\nBenchmarkTwice-2 1 1 ns/op\n",
            )
            .with_no_target("BenchmarkMissing")
            .with_output("BenchmarkGood", "BenchmarkGood 1 42 ns/op\n");
        let suite = BenchmarkSuite::new("go", &benchmarks, &runner);

        let set = suite.run(None);
        assert_eq!(set.len(), 1);
        assert!(set.get("BenchmarkGood").is_some());
        assert_eq!(runner.invocations().len(), 5);
    }

    #[test]
    fn test_duplicate_unique_name_rejects_later_entry() {
        let mut second = resolved("BenchmarkOther", "");
        second.unique_name = "BenchmarkA".to_string();
        let benchmarks = vec![resolved("BenchmarkA", ""), second];
        let runner = FakeRunner::new()
            .with_output("BenchmarkA", "BenchmarkA 1 10 ns/op\n")
            .with_output("BenchmarkOther", "BenchmarkOther 1 99 ns/op\n");
        let suite = BenchmarkSuite::new("go", &benchmarks, &runner);

        let set = suite.run(None);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("BenchmarkA").unwrap().ns_per_op, 10.0);
    }

    #[test]
    fn test_result_set_insert_duplicate() {
        let mut set = ResultSet::new();
        set.insert("a", Measurement::default()).unwrap();
        assert!(matches!(
            set.insert("a", Measurement::default()),
            Err(BenchmarkError::DuplicateUniqueName(name)) if name == "a"
        ));
    }
}
